//! Rich, structured reply content.

use serde::{Deserialize, Serialize};

/// A single titled field inside an [`Embed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// An embed-like rich reply.
///
/// Hosts that cannot render embeds are free to flatten one with
/// [`Embed::to_plain_text`].
///
/// # Example
///
/// ```rust
/// use parley_core::Embed;
///
/// let embed = Embed::new()
///     .title("Dice")
///     .description("You rolled a 4")
///     .field("sides", "6", true);
/// assert_eq!(embed.fields.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Embed {
    /// Keys whose presence marks a JSON object as embed-shaped.
    pub const SHAPE_KEYS: &'static [&'static str] =
        &["title", "description", "url", "color", "fields", "footer"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Returns `true` if a JSON object has at least one embed key.
    pub fn is_embed_shaped(map: &serde_json::Map<String, serde_json::Value>) -> bool {
        Self::SHAPE_KEYS.iter().any(|key| map.contains_key(*key))
    }

    /// Flattens the embed into plain text, one line per part.
    pub fn to_plain_text(&self) -> String {
        let mut lines = Vec::new();
        if let Some(title) = &self.title {
            lines.push(format!("**{title}**"));
        }
        if let Some(description) = &self.description {
            lines.push(description.clone());
        }
        for field in &self.fields {
            lines.push(format!("{}: {}", field.name, field.value));
        }
        if let Some(url) = &self.url {
            lines.push(url.clone());
        }
        if let Some(footer) = &self.footer {
            lines.push(format!("-- {footer}"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embed_shape_detection() {
        let shaped = json!({ "title": "hi" });
        let plain = json!({ "content": "hi" });
        assert!(Embed::is_embed_shaped(shaped.as_object().unwrap()));
        assert!(!Embed::is_embed_shaped(plain.as_object().unwrap()));
    }

    #[test]
    fn test_embed_deserialize_partial() {
        let embed: Embed =
            serde_json::from_value(json!({ "description": "body", "color": 255 })).unwrap();
        assert_eq!(embed.description.as_deref(), Some("body"));
        assert_eq!(embed.color, Some(255));
        assert!(embed.fields.is_empty());
    }

    #[test]
    fn test_plain_text_rendering() {
        let embed = Embed::new()
            .title("Stats")
            .field("wins", "3", true)
            .footer("today");
        assert_eq!(embed.to_plain_text(), "**Stats**\nwins: 3\n-- today");
    }
}
