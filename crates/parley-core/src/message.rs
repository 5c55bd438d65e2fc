//! Incoming messages and the channel capability used to answer them.
//!
//! The core treats the host platform as an opaque capability set: a message
//! exposes its `content`, the identity of its author, and a [`Channel`] that
//! can send plain text or an [`Embed`] back to where it came from.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embed::Embed;
use crate::error::{EmitError, EmitResult};

/// The author of a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform user id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the account is automated.
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Marks this author as an automated account.
    pub fn bot(mut self) -> Self {
        self.bot = true;
        self
    }
}

/// Emission primitives of the conversation a message arrived in.
///
/// Implemented by host integrations. `send_embed` defaults to rejecting rich
/// content so text-only hosts only need to implement [`send`](Channel::send).
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Returns the channel identifier.
    fn id(&self) -> &str;

    /// Sends plain text to the channel.
    async fn send(&self, text: &str) -> EmitResult<()>;

    /// Sends rich content to the channel.
    async fn send_embed(&self, _embed: &Embed) -> EmitResult<()> {
        Err(EmitError::Unsupported("embed"))
    }
}

/// A shared channel trait object.
pub type BoxedChannel = Arc<dyn Channel>;

/// A message received from the host platform.
#[derive(Clone)]
pub struct Message {
    /// Platform message id.
    pub id: String,
    /// Raw text content.
    pub content: String,
    /// Who sent it.
    pub author: Author,
    /// Where it was sent, and how to reply.
    pub channel: BoxedChannel,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        author: Author,
        channel: BoxedChannel,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            author,
            channel,
        }
    }

    /// Sends plain text back to this message's channel.
    pub async fn reply(&self, text: &str) -> EmitResult<()> {
        self.channel.send(text).await
    }

    /// Sends an embed back to this message's channel.
    pub async fn reply_embed(&self, embed: &Embed) -> EmitResult<()> {
        self.channel.send_embed(embed).await
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("content", &self.content)
            .field("author", &self.author)
            .field("channel", &self.channel.id())
            .finish()
    }
}
