pub mod completion_llm;
pub mod db;
pub mod file_store;

pub use completion_llm::OpenRouterCompletionAdapter;
pub use db::DbAdapter;
pub use file_store::LocalFileStore;
