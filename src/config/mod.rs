// Configuration module
// Public interface for backend selection and configuration loading

mod loader;
mod settings;

pub use loader::{load_config, load_config_from};
pub use settings::{BackendKind, FieldMap, LlmConfig};
