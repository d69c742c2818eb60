// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod identity;
pub mod observability;
pub mod render;
pub mod types;

// Re-exports
pub use chat::{ChatConfig, ChatController, SubmitOutcome};
pub use client::{AssistantClient, Exchange};
pub use error::{Error, Result};
pub use identity::{FileStore, IdentityStore, KeyValueStore, MemoryStore};
pub use observability::register_biometrics;
pub use types::*;
