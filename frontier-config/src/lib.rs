pub mod config;
pub mod keys;
pub mod settings;

pub use config::{ConfigError, Configurable};
pub use keys::KeyTemplates;
pub use settings::{
    FrontierSettings, LoggingSettings, RetrySettings, SeedSettings, StoreSettings,
    WorkerSettings,
};
