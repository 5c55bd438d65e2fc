//! Prefix matching and command-line splitting.
//!
//! A [`Prefix`] is the configured form of "how does a message address the
//! bot". It is compiled into a [`PrefixMatcher`] once the bot identity is
//! known, since the self-mention form depends on the client id. The matcher
//! reports how many bytes of the message the prefix covers; the remainder is
//! split into a [`ParsedCommand`].

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use parley_core::ClientInfo;

use crate::error::EmptyCommand;
use crate::shell::shell_split;

/// Config string that selects the self-mention prefix.
pub const MENTION: &str = "@mention";

/// A custom prefix matcher: returns the byte length of the matched prefix.
pub type PrefixFn = Arc<dyn Fn(&str) -> Option<usize> + Send + Sync>;

/// How a message must start to be treated as a command.
#[derive(Clone)]
pub enum Prefix {
    /// A literal string, optionally preceded by whitespace.
    Literal(String),
    /// A mention of the bot account, e.g. `<@123> ping`.
    Mention,
    /// A closure deciding where the prefix ends.
    Custom(PrefixFn),
    /// The first alternative that matches wins.
    Any(Vec<Prefix>),
}

impl Prefix {
    pub fn literal(prefix: impl Into<String>) -> Self {
        Self::Literal(prefix.into())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<usize> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Builds a prefix from config strings. [`MENTION`] selects the mention
    /// matcher; anything else is a literal. Several strings become
    /// [`Prefix::Any`].
    pub fn from_config<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut all: Vec<Prefix> = prefixes
            .into_iter()
            .map(|p| match p.as_ref() {
                MENTION => Prefix::Mention,
                other => Prefix::literal(other),
            })
            .collect();
        if all.len() == 1 {
            all.remove(0)
        } else {
            Prefix::Any(all)
        }
    }

    /// Compiles the prefix against the current bot identity.
    pub fn compile(&self, client: Option<&ClientInfo>) -> PrefixMatcher {
        match self {
            Self::Literal(p) => {
                PrefixMatcher::Regex(build_regex(&format!(r"^\s*{}", regex::escape(p))))
            }
            Self::Mention => match client {
                Some(client) => PrefixMatcher::Regex(build_regex(&format!(
                    r"^\s*<@!?{}>\s*",
                    regex::escape(&client.user_id)
                ))),
                None => PrefixMatcher::Never,
            },
            Self::Custom(f) => PrefixMatcher::Custom(f.clone()),
            Self::Any(all) => {
                PrefixMatcher::Any(all.iter().map(|p| p.compile(client)).collect())
            }
        }
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Self::literal("!")
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(p) => f.debug_tuple("Literal").field(p).finish(),
            Self::Mention => f.write_str("Mention"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Any(all) => f.debug_tuple("Any").field(all).finish(),
        }
    }
}

impl From<&str> for Prefix {
    fn from(prefix: &str) -> Self {
        Prefix::from_config([prefix])
    }
}

impl From<String> for Prefix {
    fn from(prefix: String) -> Self {
        Prefix::from_config([prefix])
    }
}

fn build_regex(pattern: &str) -> Option<Regex> {
    // Escaped input always compiles; an id too large for the regex size
    // limit simply never matches.
    Regex::new(pattern).ok()
}

/// A [`Prefix`] compiled for one bot identity.
#[derive(Clone)]
pub enum PrefixMatcher {
    Regex(Option<Regex>),
    Custom(PrefixFn),
    Any(Vec<PrefixMatcher>),
    /// Matches nothing, e.g. a mention prefix before the bot is ready.
    Never,
}

impl PrefixMatcher {
    /// Returns the byte length of the prefix at the start of `text`.
    pub fn find(&self, text: &str) -> Option<usize> {
        match self {
            Self::Regex(re) => re.as_ref()?.find(text).map(|m| m.end()),
            Self::Custom(f) => f(text).filter(|&end| text.is_char_boundary(end)),
            Self::Any(all) => all.iter().find_map(|m| m.find(text)),
            Self::Never => None,
        }
    }

    /// Returns `text` with the prefix removed, or `None` if it does not match.
    pub fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.find(text).map(|end| &text[end..])
    }
}

impl fmt::Debug for PrefixMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(re) => f
                .debug_tuple("Regex")
                .field(&re.as_ref().map(Regex::as_str))
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Any(all) => f.debug_tuple("Any").field(all).finish(),
            Self::Never => f.write_str("Never"),
        }
    }
}

/// A message split into command identifier and argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The original message text.
    pub raw: String,
    /// The text after the prefix, trimmed.
    pub trimmed: String,
    /// The first whitespace-delimited word of `trimmed`.
    pub identifier: String,
    /// Shell-split tokens after the identifier.
    pub args: Vec<String>,
    /// Everything after the identifier, as one string.
    pub raw_args: String,
}

impl ParsedCommand {
    /// Splits the prefix-stripped `rest` of `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCommand`] when nothing but whitespace follows the prefix.
    pub fn parse(raw: &str, rest: &str) -> Result<Self, EmptyCommand> {
        let trimmed = rest.trim();
        if trimmed.is_empty() {
            return Err(EmptyCommand);
        }

        let (identifier, raw_args) = match trimmed.find(char::is_whitespace) {
            Some(idx) => (&trimmed[..idx], trimmed[idx..].trim_start()),
            None => (trimmed, ""),
        };

        Ok(Self {
            raw: raw.to_string(),
            trimmed: trimmed.to_string(),
            identifier: identifier.to_string(),
            args: shell_split(raw_args),
            raw_args: raw_args.to_string(),
        })
    }

    /// Strips the prefix matched by `matcher` and splits the rest.
    ///
    /// Returns `None` if the prefix does not match.
    pub fn from_message(
        raw: &str,
        matcher: &PrefixMatcher,
    ) -> Option<Result<Self, EmptyCommand>> {
        matcher.strip(raw).map(|rest| Self::parse(raw, rest))
    }
}
