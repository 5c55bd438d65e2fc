//! # Parley Core
//!
//! Host-facing foundation types for the Parley command framework.
//!
//! The routing core never talks to a chat platform directly. Instead, an
//! integration hands it values built from the types in this crate:
//!
//! - **Messages**: [`Message`] with its [`Author`] and an emission-capable
//!   [`Channel`]
//! - **Rich content**: [`Embed`] for structured replies
//! - **Identity**: [`ClientInfo`] describing the bot account itself, used for
//!   self-mention prefixes and echo suppression
//! - **Host events**: [`HostEvent`], the closed set of platform events the
//!   runtime understands
//!
//! ```text
//! ┌────────────────┐  HostEvent   ┌────────────┐  Channel::send   ┌────────────────┐
//! │ Host platform  │─────────────▶│ Dispatcher │─────────────────▶│ Host platform  │
//! └────────────────┘              └────────────┘                  └────────────────┘
//! ```

pub mod client;
pub mod embed;
pub mod error;
pub mod event;
pub mod message;

pub use client::ClientInfo;
pub use embed::{Embed, EmbedField};
pub use error::{EmitError, EmitResult};
pub use event::HostEvent;
pub use message::{Author, BoxedChannel, Channel, Message};
