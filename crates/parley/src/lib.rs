//! # Parley
//!
//! A typed, middleware-driven command framework for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐ HostEvent ┌─────────┐  message  ┌────────────┐   Context   ┌──────────────────────┐
//! │  Host   │──────────▶│ Runtime │──────────▶│ Dispatcher │────────────▶│ dispatcher layers    │
//! │ adapter │           │  queue  │           │  filters,  │             │  └ command layers    │
//! └─────────┘           └─────────┘           │  prefix,   │◀────────────│     └ handler        │
//!                            │                │  lookup    │  Response   └──────────────────────┘
//!                            ▼                └────────────┘
//!                       event table ◀──── dispatchFail / commandLoad / commandUnload
//! ```
//!
//! - **Core**: messages, channels, embeds and host events
//! - **Framework**: parameter grammar, argument resolution, registries,
//!   middleware and the dispatcher
//! - **Runtime**: configuration, logging and the event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ParleyRuntime::new()?;
//!
//!     runtime
//!         .load_command(
//!             CommandConfig::new("roll")
//!                 .parameter("-sides(int) = 6 : faces on the die")
//!                 .handler(|ctx: Context| async move {
//!                     let sides = ctx.args().int("sides").unwrap_or(6);
//!                     format!("You rolled a d{sides}")
//!                 }),
//!         )
//!         .await?;
//!
//!     let events = runtime.sender()?;
//!     my_host::connect(events);
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log lines

pub use parley_core as core;
pub use parley_framework as framework;
pub use parley_runtime as runtime;

/// Commonly used types for building a bot.
///
/// ```rust,ignore
/// use parley::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use parley_runtime::{ParleyConfig, ParleyRuntime};

    // Commands and handlers
    pub use parley_framework::{
        ArgValue, Args, BoxError, CommandConfig, Context, IntoReply, ParamType, ParameterSpec,
        Responder, Response,
    };

    // Middleware
    pub use parley_framework::{CommandLayer, DispatchLayer, Next, from_fn};

    // Dispatch and events
    pub use parley_framework::{
        DispatchOutcome, Dispatcher, EventPayload, FailureKind, Prefix, ServiceContainer,
    };

    // Host types
    pub use parley_core::{Author, Channel, ClientInfo, Embed, EmitResult, HostEvent, Message};
}
