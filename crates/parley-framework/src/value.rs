//! Typed argument values and the resolved argument map.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::shell::quote;

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    /// Values bound to a repeatable rule.
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as `f64`; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Renders the value as definition-grammar default tokens, quoting
    /// strings that would not survive re-tokenisation.
    pub(crate) fn to_default_tokens(&self) -> String {
        match self {
            Self::String(s) => quote(s),
            Self::List(items) => items
                .iter()
                .map(Self::to_default_tokens)
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Resolved arguments of one dispatch, keyed by parameter name.
///
/// Every rule of the matched command has an entry. Optional rules without a
/// default and without input are bound to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Args {
    values: HashMap<String, Option<ArgValue>>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&mut self, name: &str, value: Option<ArgValue>) {
        self.values.insert(name.to_string(), value);
    }

    /// Returns the value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Returns `true` if `name` has an entry, even an unbound one.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_i64)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn list(&self, name: &str) -> Option<&[ArgValue]> {
        self.get(name).and_then(ArgValue::as_list)
    }

    /// Returns the string items of a repeatable rule.
    pub fn strings(&self, name: &str) -> Vec<&str> {
        self.list(name)
            .map(|items| items.iter().filter_map(ArgValue::as_str).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let mut args = Args::new();
        args.bind("name", Some("bob".into()));
        args.bind("count", Some(3i64.into()));
        args.bind("tags", Some(vec!["a", "b"].into()));
        args.bind("note", None);

        assert_eq!(args.str("name"), Some("bob"));
        assert_eq!(args.int("count"), Some(3));
        assert_eq!(args.number("count"), Some(3.0));
        assert_eq!(args.strings("tags"), vec!["a", "b"]);
        assert!(args.contains("note"));
        assert_eq!(args.get("note"), None);
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_default_tokens_quote_strings() {
        let value = ArgValue::from(vec!["plain", "two words", ""]);
        assert_eq!(value.to_default_tokens(), "plain 'two words' ''");
        assert_eq!(ArgValue::Number(1.5).to_default_tokens(), "1.5");
    }

    #[test]
    fn test_serialize_untagged() {
        let mut args = Args::new();
        args.bind("n", Some(ArgValue::Integer(2)));
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json, serde_json::json!({ "n": 2 }));
    }
}
