//! Configuration schema and loading for Trellis.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{default_config_path, load_config, load_from_path};
pub use model::{
    DEFAULT_DENIAL_MESSAGE, DenialConfig, HistoryConfig, PolicyConfig, RetrievalConfig,
    TrellisConfig, TrellisConfigBuilder,
};
