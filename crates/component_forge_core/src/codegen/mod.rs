//! The text pipeline behind a generation turn: prompt composition, extraction of
//! JSON from free-form replies, dialect cross-derivation, and preview synthesis.

pub mod convert;
pub mod normalize;
pub mod preview;
pub mod prompt;
pub mod scan;

pub use normalize::{normalize, NormalizedComponent, DEFAULT_EXPLANATION};
pub use preview::{render_preview, ComponentLocator, EXPORT_NAME};
pub use prompt::{system_prompt, user_prompt, PreviousCode};
