pub mod codegen;
pub mod domain;
pub mod generation;
pub mod ports;

pub use domain::{
    Attachment, CodeBundle, ComponentSnapshot, Dialect, GenerationMetadata, Message, NewUser,
    Preferences, PreferencesPatch, ProfileUpdate, Role, Session, SessionPage, SessionQuery,
    SessionStatus, SessionUpdate, Theme, User, UserCredentials, UserStats,
};
pub use generation::{ComponentGenerator, GenerationOutcome, GenerationRequest};
pub use ports::{
    Completion, CompletionRequest, CompletionService, DatabaseService, FileStorageService,
    PortError, PortResult, StoredFile,
};
