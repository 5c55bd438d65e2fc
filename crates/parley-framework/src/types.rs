//! Parameter type system.
//!
//! Maps declared type names onto four canonical kinds and provides the
//! validation ([`is_type`]) and coercion ([`convert_type`]) used both for
//! defaults at registration time and for tokens at dispatch time.
//!
//! | Kind      | Accepted names                 | Accepts                                 |
//! |-----------|--------------------------------|-----------------------------------------|
//! | `boolean` | `bool`, `boolean`              | `true` / `false`, any case              |
//! | `integer` | `int`, `integer`               | any finite number, truncated toward zero |
//! | `number`  | `num`, `number`, `float`       | any finite number                       |
//! | `string`  | `str`, `string`, `text`        | anything                                |
//!
//! Type names are resolved once through [`ParamType::from_str`](std::str::FromStr);
//! an unknown name is a definition error, so dispatch never sees one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::ArgValue;

/// The canonical parameter kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Boolean,
    Integer,
    Number,
    #[default]
    String,
}

impl ParamType {
    /// Returns the canonical name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
        }
    }

    /// Returns `true` if `token` can be coerced into this kind.
    pub fn accepts(self, token: &str) -> bool {
        match self {
            Self::Boolean => parse_bool(token).is_some(),
            Self::Integer => parse_number(token).and_then(truncate).is_some(),
            Self::Number => parse_number(token).is_some(),
            Self::String => true,
        }
    }

    /// Coerces `token` into a typed value, or `None` if it does not match.
    pub fn convert(self, token: &str) -> Option<ArgValue> {
        match self {
            Self::Boolean => parse_bool(token).map(ArgValue::Boolean),
            Self::Integer => parse_number(token)
                .and_then(truncate)
                .map(ArgValue::Integer),
            Self::Number => parse_number(token).map(ArgValue::Number),
            Self::String => Some(ArgValue::String(token.to_string())),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type name '{0}'")]
pub struct UnknownType(pub String);

impl FromStr for ParamType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Self::Boolean),
            "int" | "integer" => Ok(Self::Integer),
            "num" | "number" | "float" => Ok(Self::Number),
            "str" | "string" | "text" => Ok(Self::String),
            _ => Err(UnknownType(s.to_string())),
        }
    }
}

/// Returns `true` if `token` is a valid value of `ty`.
pub fn is_type(token: &str, ty: ParamType) -> bool {
    ty.accepts(token)
}

/// Converts `token` into a value of `ty`.
pub fn convert_type(token: &str, ty: ParamType) -> Option<ArgValue> {
    ty.convert(token)
}

fn parse_bool(token: &str) -> Option<bool> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses a finite numeric literal: decimal, exponent, or a `0x`/`0o`/`0b`
/// integer with an optional sign.
fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let (negative, unsigned) = match token.as_bytes()[0] {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };

    let radix = match unsigned.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };

    let value = if let Some(radix) = radix {
        let digits = &unsigned[2..];
        // The sign belongs before the radix prefix only.
        if digits.starts_with(['+', '-']) {
            return None;
        }
        i64::from_str_radix(digits, radix).ok()? as f64
    } else {
        // `f64::from_str` also accepts "inf" and "nan"; those fail the
        // finiteness check below.
        if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return None;
        }
        unsigned.parse::<f64>().ok()?
    };

    let value = if negative { -value } else { value };
    value.is_finite().then_some(value)
}

fn truncate(value: f64) -> Option<i64> {
    let truncated = value.trunc();
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}
