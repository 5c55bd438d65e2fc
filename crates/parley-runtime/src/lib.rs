//! Parley Runtime: configuration, logging and the event loop.
//!
//! - [`config`]: layered figment configuration (`parley.toml`, `PARLEY_*`)
//! - [`logging`]: `tracing-subscriber` setup driven by that configuration
//! - [`ParleyRuntime`]: owns a [`Dispatcher`](parley_framework::Dispatcher)
//!   and drains a queue of host events into it
//!
//! ```rust,ignore
//! use parley_runtime::ParleyRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ParleyRuntime::new()?;
//!     runtime.load_command(ping()).await?;
//!     let events = runtime.sender()?;
//!     spawn_host(events);
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, ParleyConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{EventSender, ParleyRuntime, RuntimeBuilder, RuntimeStats};

pub use tracing;
pub use tracing_subscriber;
