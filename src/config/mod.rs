pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_DIR, ENV_PREFIX, LoadError, load_config};
pub use models::*;
pub use validation::{AppConfigValidator, ValidationError, ValidationResult};
