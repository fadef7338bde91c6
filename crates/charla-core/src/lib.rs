pub mod chat;
pub mod error;
pub mod ollama;
pub mod session;

// Re-export main types for convenience
pub use chat::{Message, Role};
pub use error::ChatError;
pub use ollama::{ChatStream, ModelInfo, OllamaClient};
pub use session::{ChatSession, DEFAULT_IMAGE_PROMPT};
