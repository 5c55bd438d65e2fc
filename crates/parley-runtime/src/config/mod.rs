//! Configuration for Parley bots.
//!
//! Settings are layered with figment from defaults, TOML/YAML files and
//! `PARLEY_*` environment variables; see [`loader`] for the precedence.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ParleyConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
