use std::fmt;

use crate::types::ParamType;
use crate::value::ArgValue;

/// A validated, typed description of one command argument slot.
///
/// Rules are immutable once built. Their [`Display`](fmt::Display) output is
/// the canonical definition string, which parses back into an equal rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRule {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) optional: bool,
    pub(crate) kind: ParamType,
    pub(crate) repeatable: bool,
    pub(crate) literal: bool,
    pub(crate) default: Option<ArgValue>,
}

impl ParameterRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }

    pub fn kind(&self) -> ParamType {
        self.kind
    }

    /// Consumes every remaining token as a list.
    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    /// Captures the remaining raw input verbatim.
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// The value bound when no input is left. Repeatable rules default to an
    /// empty list.
    pub fn default_value(&self) -> Option<&ArgValue> {
        self.default.as_ref()
    }

    /// Renders the rule for usage lines: `<name>`, `[name]`, `<name...>`.
    pub fn usage(&self) -> String {
        let suffix = if self.repeatable || self.literal {
            "..."
        } else {
            ""
        };
        if self.optional {
            format!("[{}{suffix}]", self.name)
        } else {
            format!("<{}{suffix}>", self.name)
        }
    }

    fn has_visible_default(&self) -> bool {
        match &self.default {
            Some(ArgValue::List(items)) => !items.is_empty(),
            Some(_) => true,
            None => false,
        }
    }
}

impl fmt::Display for ParameterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            f.write_str("-")?;
        }
        write!(f, "{}({})", self.name, self.kind)?;
        if self.repeatable {
            f.write_str("*")?;
        }
        if self.literal {
            f.write_str("+")?;
        }
        if self.has_visible_default()
            && let Some(default) = &self.default
        {
            write!(f, " = {}", default.to_default_tokens())?;
        }
        if let Some(description) = &self.description {
            write!(f, " : {description}")?;
        }
        Ok(())
    }
}
