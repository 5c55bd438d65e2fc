//! Handler responses and their classification.
//!
//! Whatever a handler returns is first turned into a [`Response`] through
//! [`IntoReply`], then reduced by [`Response::classify`] into exactly one
//! [`Classified`] action:
//!
//! | Response                  | Action                                                  |
//! |---------------------------|---------------------------------------------------------|
//! | `Empty`, empty text       | nothing is sent                                         |
//! | `Text`                    | sent as plain text                                      |
//! | `Choice`                  | one element picked uniformly; it must be text           |
//! | `Embed`                   | sent as rich content                                    |
//! | `Custom`                  | the [`Responder`] sends whatever it likes               |
//! | `Json`                    | inspected at runtime and mapped onto the cases above    |

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use tower::BoxError;

use parley_core::{Embed, EmitResult};

use crate::context::Context;
use crate::error::ClassificationError;

/// A response that emits itself.
///
/// The responder receives the context the dispatcher built for the message,
/// so it can reply, inspect arguments, or fetch services.
#[async_trait]
pub trait Responder: Send + Sync + 'static {
    async fn respond(&self, ctx: &Context) -> EmitResult<()>;
}

/// The value a handler or middleware produced.
#[derive(Clone, Default)]
pub enum Response {
    #[default]
    Empty,
    Text(String),
    /// Pick one element at random.
    Choice(Vec<Response>),
    Embed(Embed),
    Custom(Arc<dyn Responder>),
    /// A dynamically shaped value, classified by inspection.
    Json(Value),
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn choice<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Response>,
    {
        Self::Choice(items.into_iter().map(Into::into).collect())
    }

    pub fn custom(responder: impl Responder) -> Self {
        Self::Custom(Arc::new(responder))
    }

    /// Returns `true` if classifying this response sends nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Json(value) => matches!(value, Value::Null | Value::Bool(false))
                || value.as_str().is_some_and(str::is_empty),
            _ => false,
        }
    }

    fn as_choice_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Json(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "string",
            Self::Choice(_) => "array",
            Self::Embed(_) => "embed",
            Self::Custom(_) => "custom",
            Self::Json(value) => json_kind(value),
        }
    }

    /// Reduces the response to one action.
    ///
    /// # Errors
    ///
    /// Fails when a choice is empty or lands on a non-text element, or when a
    /// JSON value has no response interpretation.
    pub fn classify<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Classified, ClassificationError> {
        match self {
            Self::Empty => Ok(Classified::Nothing),
            Self::Text(text) if text.is_empty() => Ok(Classified::Nothing),
            Self::Text(text) => Ok(Classified::Text(text)),
            Self::Choice(items) => {
                // Every element must be text, whichever one is picked.
                if let Some(other) = items.iter().find(|item| item.as_choice_text().is_none()) {
                    return Err(ClassificationError::NonStringChoice {
                        found: other.kind(),
                    });
                }
                items
                    .choose(rng)
                    .and_then(Self::as_choice_text)
                    .map(|text| Classified::Text(text.to_string()))
                    .ok_or(ClassificationError::EmptyChoice)
            }
            Self::Embed(embed) => Ok(Classified::Embed(embed)),
            Self::Custom(responder) => Ok(Classified::Custom(responder)),
            Self::Json(value) => Self::from_json(value)?.classify(rng),
        }
    }

    /// Maps a JSON value onto a typed response.
    fn from_json(value: Value) -> Result<Self, ClassificationError> {
        match value {
            Value::Null | Value::Bool(false) => Ok(Self::Empty),
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => Ok(Self::Choice(items.into_iter().map(Self::Json).collect())),
            Value::Object(map) if Embed::is_embed_shaped(&map) => {
                serde_json::from_value(Value::Object(map))
                    .map(Self::Embed)
                    .map_err(|e| ClassificationError::Unrecognized {
                        found: format!("embed-like object ({e})"),
                    })
            }
            other => Err(ClassificationError::Unrecognized {
                found: json_kind(&other).to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Choice(items) => f.debug_tuple("Choice").field(items).finish(),
            Self::Embed(embed) => f.debug_tuple("Embed").field(embed).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Embed> for Response {
    fn from(embed: Embed) -> Self {
        Self::Embed(embed)
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// The single action a response reduces to.
#[derive(Clone)]
pub enum Classified {
    Nothing,
    Text(String),
    Embed(Embed),
    Custom(Arc<dyn Responder>),
}

impl Classified {
    /// Performs the action against the message in `ctx`.
    ///
    /// Returns `true` if anything was sent.
    pub async fn emit(self, ctx: &Context) -> EmitResult<bool> {
        match self {
            Self::Nothing => Ok(false),
            Self::Text(text) => ctx.message().reply(&text).await.map(|()| true),
            Self::Embed(embed) => ctx.message().reply_embed(&embed).await.map(|()| true),
            Self::Custom(responder) => responder.respond(ctx).await.map(|()| true),
        }
    }
}

impl fmt::Debug for Classified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Embed(embed) => f.debug_tuple("Embed").field(embed).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Conversion of handler return values into a [`Response`].
///
/// `Err` values become handler errors; `None` and `()` send nothing.
pub trait IntoReply: Send + 'static {
    fn into_reply(self) -> Result<Response, BoxError>;
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::Empty)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(self)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::from(self))
    }
}

impl IntoReply for Vec<String> {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::choice(self))
    }
}

impl IntoReply for Vec<&'static str> {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::choice(self))
    }
}

impl IntoReply for Embed {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::Embed(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(Response::Json(self))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Response, BoxError> {
        match self {
            Some(inner) => inner.into_reply(),
            None => Ok(Response::Empty),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError> + Send + 'static,
{
    fn into_reply(self) -> Result<Response, BoxError> {
        self.map_err(Into::into)?.into_reply()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_empty_values_send_nothing() {
        for response in [
            Response::Empty,
            Response::text(""),
            Response::Json(Value::Null),
            Response::Json(json!(false)),
        ] {
            assert!(response.is_empty());
            assert!(matches!(response.classify(&mut rng()), Ok(Classified::Nothing)));
        }
    }

    #[test]
    fn test_choice_picks_one_string() {
        let mut rng = rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            match Response::choice(["yes", "no"]).classify(&mut rng) {
                Ok(Classified::Text(text)) => {
                    assert!(text == "yes" || text == "no");
                    seen.insert(text);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_choice_rejects_non_strings() {
        let mut rng = rng();
        for _ in 0..16 {
            let err = Response::Json(json!([1])).classify(&mut rng).unwrap_err();
            assert_eq!(err, ClassificationError::NonStringChoice { found: "number" });
        }
        let err = Response::Choice(vec![Response::Embed(Embed::new())])
            .classify(&mut rng)
            .unwrap_err();
        assert_eq!(err, ClassificationError::NonStringChoice { found: "embed" });
    }

    #[test]
    fn test_mixed_choice_always_fails() {
        let mut rng = rng();
        for _ in 0..64 {
            let err = Response::Json(json!(["yes", 1])).classify(&mut rng).unwrap_err();
            assert_eq!(err, ClassificationError::NonStringChoice { found: "number" });
        }
        let err = Response::Choice(vec![Response::text("ok"), Response::Empty])
            .classify(&mut rng)
            .unwrap_err();
        assert_eq!(err, ClassificationError::NonStringChoice { found: "empty" });
    }

    #[test]
    fn test_empty_choice() {
        let err = Response::Choice(Vec::new()).classify(&mut rng()).unwrap_err();
        assert_eq!(err, ClassificationError::EmptyChoice);
    }

    #[test]
    fn test_json_classification() {
        let mut rng = rng();
        assert!(matches!(
            Response::Json(json!("hi")).classify(&mut rng),
            Ok(Classified::Text(ref t)) if t == "hi"
        ));
        assert!(matches!(
            Response::Json(json!({"title": "Stats", "description": "ok"})).classify(&mut rng),
            Ok(Classified::Embed(ref e)) if e.title.as_deref() == Some("Stats")
        ));
        assert!(matches!(
            Response::Json(json!(42)).classify(&mut rng),
            Err(ClassificationError::Unrecognized { .. })
        ));
        assert!(matches!(
            Response::Json(json!({"unrelated": true})).classify(&mut rng),
            Err(ClassificationError::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_into_reply() {
        assert!(matches!(().into_reply(), Ok(Response::Empty)));
        assert!(matches!("hi".into_reply(), Ok(Response::Text(ref t)) if t == "hi"));
        assert!(matches!(None::<String>.into_reply(), Ok(Response::Empty)));
        assert!(matches!(vec!["a", "b"].into_reply(), Ok(Response::Choice(ref v)) if v.len() == 2));

        let failed: Result<String, std::io::Error> = Err(std::io::Error::other("boom"));
        assert_eq!(failed.into_reply().unwrap_err().to_string(), "boom");
    }
}
