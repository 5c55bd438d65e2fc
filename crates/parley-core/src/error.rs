//! Error types shared with host integrations.

use thiserror::Error;

/// Errors raised by a [`Channel`](crate::Channel) while emitting a reply.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
    /// The host rejected or failed to deliver the message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The channel is no longer reachable.
    #[error("channel '{channel}' is closed")]
    ChannelClosed {
        /// Identifier of the closed channel.
        channel: String,
    },

    /// The channel cannot carry this kind of content.
    #[error("channel does not support {0} content")]
    Unsupported(&'static str),
}

impl EmitError {
    /// Creates a send failure from any displayable reason.
    pub fn send_failed(reason: impl std::fmt::Display) -> Self {
        Self::SendFailed(reason.to_string())
    }
}

impl From<std::io::Error> for EmitError {
    fn from(err: std::io::Error) -> Self {
        Self::SendFailed(err.to_string())
    }
}

/// Result type for emission operations.
pub type EmitResult<T> = Result<T, EmitError>;
