//! # Parley Framework
//!
//! The command-routing core of Parley: it turns the text of a chat message
//! into a validated, typed argument set, selects a registered command, runs
//! it through an ordered middleware pipeline, and reduces the handler's
//! return value to a single action.
//!
//! ## Pieces
//!
//! - **Parameters** ([`parameter`], [`types`]): the definition mini-grammar
//!   (`-count(int) = 3 : how many`), parsed once at registration time
//! - **Arguments** ([`resolver`], [`shell`]): shell-style tokenising and
//!   lockstep matching of tokens against rules, producing [`Args`]
//! - **Commands** ([`command`], [`registry`]): validated command objects,
//!   indexed by name and alias
//! - **Services** ([`service`]): constructed, singleton and instance bindings
//! - **Pipeline** ([`middleware`], [`handler`], [`response`]): onion-model
//!   layers over tower services, and classification of handler results
//! - **Dispatch** ([`dispatcher`], [`events`]): the per-message state machine
//!   and the event table it reports to
//!
//! ## Example
//!
//! ```rust
//! use parley_framework::{CommandConfig, Context, Dispatcher};
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::builder().prefix("!").build();
//! dispatcher
//!     .load_command(
//!         CommandConfig::new("echo")
//!             .parameter("text+")
//!             .handler(|ctx: Context| async move {
//!                 ctx.args().str("text").unwrap_or_default().to_string()
//!             }),
//!     )
//!     .await
//!     .unwrap();
//! assert!(dispatcher.commands().contains("echo"));
//! # });
//! ```

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handler;
pub mod middleware;
pub mod parameter;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod service;
pub mod shell;
pub mod signature;
pub mod types;
pub mod value;

pub use command::{Command, CommandConfig, CommandLayer};
pub use context::Context;
pub use dispatcher::{
    DispatchFailure, DispatchLayer, DispatchOptions, DispatchOutcome, Dispatcher,
    DispatcherBuilder, FailureKind,
};
pub use error::{
    ArgumentError, ClassificationError, DefinitionError, EmptyCommand, HandlerError, LoadError,
    RegistryError, ServiceError,
};
pub use events::{EventHandler, EventPayload, EventTable};
pub use handler::{BoxHandler, HandlerFn, handler_fn};
pub use middleware::{Middleware, Next, apply, from_fn};
pub use parameter::{ParameterRule, ParameterSpec};
pub use registry::CommandRegistry;
pub use response::{Classified, IntoReply, Responder, Response};
pub use service::{ServiceContainer, ServiceKind};
pub use signature::{ParsedCommand, Prefix};
pub use types::ParamType;
pub use value::{ArgValue, Args};

pub use tower::BoxError;
