//! Identity of the bot account itself.

use serde::{Deserialize, Serialize};

/// The bot's own identity on the host platform.
///
/// The dispatcher uses it to recognise messages that start by mentioning the
/// bot and to suppress the bot's own messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Platform user id of the bot account.
    pub user_id: String,
    /// Display name of the bot account.
    #[serde(default)]
    pub name: String,
}

impl ClientInfo {
    /// Creates a new client identity.
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }

    /// Returns the mention markup addressing this account (`<@id>`).
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_markup() {
        let client = ClientInfo::new("42", "parley");
        assert_eq!(client.mention(), "<@42>");
    }
}
