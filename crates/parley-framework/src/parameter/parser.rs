use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::rule::ParameterRule;
use super::spec::ParameterDefinition;
use crate::error::{DefinitionError, DefinitionResult};
use crate::shell::try_shell_split;
use crate::types::ParamType;
use crate::value::ArgValue;

/// `name`, markers, optional `(type)`, markers. Leading `-`/`+` are stripped
/// before matching.
static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[\p{L}\p{N}_][\p{L}\p{N}_-]*)\s*(?P<pre>[*+\s]*)(?:\(\s*(?P<ty>[^()]*?)\s*\))?\s*(?P<post>[*+\s]*)$",
    )
    .unwrap_or_else(|e| unreachable!("signature pattern is valid: {e}"))
});

/// A parameter name on its own, for rules built without the text grammar.
static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}_][\p{L}\p{N}_-]*$")
        .unwrap_or_else(|e| unreachable!("name pattern is valid: {e}"))
});

/// The pieces of a rule before cross-field checks.
pub(crate) struct RuleParts<'a> {
    /// Original text, for error messages.
    pub definition: &'a str,
    pub name: String,
    pub kind: Option<ParamType>,
    pub optional: bool,
    pub repeatable: bool,
    pub literal: bool,
    pub defaults: Option<Vec<String>>,
    pub description: Option<String>,
}

/// Parses one parameter definition string.
///
/// # Errors
///
/// Returns a [`DefinitionError`] naming the offending token when the grammar
/// is violated or a default does not match the declared type.
///
/// # Example
///
/// ```rust
/// use parley_framework::parameter::parse;
/// use parley_framework::ParamType;
///
/// let rule = parse("sides(int) = 6 : faces on the die").unwrap();
/// assert_eq!(rule.name(), "sides");
/// assert_eq!(rule.kind(), ParamType::Integer);
/// assert!(rule.is_optional());
/// assert_eq!(rule.description(), Some("faces on the die"));
/// ```
pub fn parse(definition: &str) -> DefinitionResult<ParameterRule> {
    let trimmed = definition.trim();
    let (head, description) = split_description(trimmed);

    let (signature, defaults) = match head.find('=') {
        Some(idx) => (&head[..idx], Some(&head[idx + 1..])),
        None => (head, None),
    };

    let signature = signature.trim();
    let body = signature.trim_start_matches(['-', '+']);
    let optional = signature[..signature.len() - body.len()].contains('-');
    let body = body.trim();

    if body.is_empty() || body.starts_with(['(', '*', '+']) {
        return Err(DefinitionError::MissingName {
            definition: definition.to_string(),
        });
    }

    let caps = SIGNATURE
        .captures(body)
        .ok_or_else(|| DefinitionError::Malformed {
            definition: definition.to_string(),
            token: body.to_string(),
        })?;

    let name = caps["name"].to_string();
    let markers: String = [caps.name("pre"), caps.name("post")]
        .into_iter()
        .flatten()
        .map(|m| m.as_str())
        .collect();

    let kind = match caps.name("ty") {
        Some(tag) => Some(tag.as_str().parse::<ParamType>().map_err(|_| {
            DefinitionError::UnknownType {
                definition: definition.to_string(),
                token: tag.as_str().to_string(),
            }
        })?),
        None => None,
    };

    let defaults = match defaults {
        Some(text) => Some(try_shell_split(text).map_err(|_| {
            DefinitionError::UnterminatedQuote {
                name: name.clone(),
                defaults: text.trim().to_string(),
            }
        })?),
        None => None,
    };

    build_rule(RuleParts {
        definition,
        name,
        kind,
        optional,
        repeatable: markers.contains('*'),
        literal: markers.contains('+'),
        defaults,
        description,
    })
}

/// Splits off the description at the first colon outside quotes. The
/// description itself may contain further colons.
fn split_description(definition: &str) -> (&str, Option<String>) {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for (idx, ch) in definition.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ':' if !in_single && !in_double => {
                let description = definition[idx + 1..].trim();
                let description = (!description.is_empty()).then(|| description.to_string());
                return (definition[..idx].trim_end(), description);
            }
            _ => {}
        }
    }

    (definition, None)
}

/// Applies the per-rule checks shared by the text grammar and
/// [`ParameterSpec`](super::ParameterSpec).
pub(crate) fn build_rule(parts: RuleParts<'_>) -> DefinitionResult<ParameterRule> {
    let RuleParts {
        definition,
        name,
        kind,
        mut optional,
        repeatable,
        literal,
        defaults,
        description,
    } = parts;

    if name.trim().is_empty() {
        return Err(DefinitionError::MissingName {
            definition: definition.to_string(),
        });
    }
    if !NAME.is_match(&name) {
        return Err(DefinitionError::Malformed {
            definition: definition.to_string(),
            token: name,
        });
    }
    if repeatable && literal {
        return Err(DefinitionError::RepeatableLiteral { name });
    }
    if literal && let Some(found) = kind.filter(|k| *k != ParamType::String) {
        return Err(DefinitionError::LiteralType { name, found });
    }

    let kind = kind.unwrap_or_default();

    let default = match defaults {
        Some(tokens) => {
            if tokens.is_empty() {
                return Err(DefinitionError::EmptyDefault { name });
            }
            if !repeatable && tokens.len() > 1 {
                return Err(DefinitionError::TooManyDefaults {
                    count: tokens.len(),
                    defaults: tokens.join(" "),
                    name,
                });
            }

            let mut values = Vec::with_capacity(tokens.len());
            for token in tokens {
                match kind.convert(&token) {
                    Some(value) => values.push(value),
                    None => {
                        return Err(DefinitionError::DefaultType {
                            name,
                            token,
                            expected: kind,
                        });
                    }
                }
            }

            optional = true;
            if repeatable {
                Some(ArgValue::List(values))
            } else {
                values.pop()
            }
        }
        None if repeatable => Some(ArgValue::List(Vec::new())),
        None => None,
    };

    Ok(ParameterRule {
        name,
        description: description.filter(|d| !d.trim().is_empty()),
        optional,
        kind,
        repeatable,
        literal,
        default,
    })
}

/// Parses a full parameter list and checks the cross-rule invariants.
///
/// # Errors
///
/// Fails on the first definition that does not parse, or on the first rule
/// that breaks an invariant:
///
/// - parameter names are unique
/// - a literal rule is the command's only rule
/// - a repeatable rule is the last rule
/// - no required rule follows an optional one
pub fn validate<I, D>(definitions: I) -> DefinitionResult<Vec<ParameterRule>>
where
    I: IntoIterator<Item = D>,
    D: Into<ParameterDefinition>,
{
    let rules = definitions
        .into_iter()
        .map(|definition| definition.into().into_rule())
        .collect::<DefinitionResult<Vec<_>>>()?;
    validate_rules(rules)
}

/// Checks the cross-rule invariants of already-built rules.
pub fn validate_rules(rules: Vec<ParameterRule>) -> DefinitionResult<Vec<ParameterRule>> {
    let mut seen = HashSet::new();
    let mut first_optional: Option<&str> = None;
    let last = rules.len().saturating_sub(1);

    for (idx, rule) in rules.iter().enumerate() {
        if !seen.insert(rule.name.as_str()) {
            return Err(DefinitionError::DuplicateParameter {
                name: rule.name.clone(),
            });
        }
        if rule.literal && rules.len() > 1 {
            return Err(DefinitionError::LiteralNotAlone {
                name: rule.name.clone(),
            });
        }
        if rule.repeatable && idx != last {
            return Err(DefinitionError::RepeatableNotLast {
                name: rule.name.clone(),
            });
        }
        if rule.optional {
            first_optional.get_or_insert(rule.name.as_str());
        } else if let Some(after) = first_optional {
            return Err(DefinitionError::RequiredAfterOptional {
                name: rule.name.clone(),
                after: after.to_string(),
            });
        }
    }

    Ok(rules)
}
