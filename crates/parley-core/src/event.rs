//! Host platform events.
//!
//! Instead of one type per platform event, the host hands the runtime a
//! single closed enum. Each variant maps to a stable event name that the
//! framework's event table uses as its registration key.

use std::sync::Arc;

use crate::client::ClientInfo;
use crate::message::Message;

/// An event emitted by the host platform.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// The connection is established and the bot identity is known.
    Ready(ClientInfo),
    /// A new message was posted.
    MessageCreate(Arc<Message>),
    /// An existing message was edited.
    MessageUpdate {
        before: Arc<Message>,
        after: Arc<Message>,
    },
    /// A message was deleted.
    MessageDelete(Arc<Message>),
}

impl HostEvent {
    pub const READY: &'static str = "ready";
    pub const MESSAGE_CREATE: &'static str = "messageCreate";
    pub const MESSAGE_UPDATE: &'static str = "messageUpdate";
    pub const MESSAGE_DELETE: &'static str = "messageDelete";

    /// Every event name a host can produce.
    pub const NAMES: &'static [&'static str] = &[
        Self::READY,
        Self::MESSAGE_CREATE,
        Self::MESSAGE_UPDATE,
        Self::MESSAGE_DELETE,
    ];

    /// Returns the registration name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => Self::READY,
            Self::MessageCreate(_) => Self::MESSAGE_CREATE,
            Self::MessageUpdate { .. } => Self::MESSAGE_UPDATE,
            Self::MessageDelete(_) => Self::MESSAGE_DELETE,
        }
    }

    /// Returns the message that should be routed to the dispatcher, if any.
    ///
    /// For edits this is the message after the edit.
    pub fn routable_message(&self) -> Option<&Arc<Message>> {
        match self {
            Self::MessageCreate(msg) => Some(msg),
            Self::MessageUpdate { after, .. } => Some(after),
            Self::Ready(_) | Self::MessageDelete(_) => None,
        }
    }
}
