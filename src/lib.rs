// gpttools-llm - unified streaming client for LLM chat backends
// Library exports

pub mod config;
pub mod errors;
pub mod providers;
pub mod session;

pub use config::{BackendKind, FieldMap, LlmConfig};
pub use errors::LlmError;
pub use providers::{ChatTurn, ConversationRequest, DeltaFragment, Role, StreamHandle};
pub use session::ChatSession;
