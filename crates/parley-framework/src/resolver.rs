//! Argument resolution.
//!
//! Matches the raw argument text of one message against a command's
//! [`ParameterRule`]s, producing an [`Args`] map. Rules and tokens are walked
//! in lockstep:
//!
//! - a required rule with no token left fails with [`ArgumentError::Missing`]
//! - a repeatable rule consumes every remaining token
//! - a literal rule binds the remaining raw text verbatim, whitespace included
//! - any other rule consumes one token, or its default when input ran out
//!
//! Resolution is all-or-nothing: on error no partial map is returned.

use crate::error::{ArgumentError, ArgumentResult};
use crate::parameter::ParameterRule;
use crate::shell::shell_split;
use crate::value::{ArgValue, Args};

/// Resolves `raw_args` against `rules`.
///
/// # Example
///
/// ```rust
/// use parley_framework::parameter::validate;
/// use parley_framework::resolver::resolve;
///
/// let rules = validate(["pool", "hello", "poor = house"]).unwrap();
/// let args = resolve(&rules, "bored boo").unwrap();
/// assert_eq!(args.str("pool"), Some("bored"));
/// assert_eq!(args.str("hello"), Some("boo"));
/// assert_eq!(args.str("poor"), Some("house"));
/// ```
pub fn resolve(rules: &[ParameterRule], raw_args: &str) -> ArgumentResult<Args> {
    let tokens = shell_split(raw_args);
    resolve_tokens(rules, &tokens, raw_args)
}

/// Resolves pre-split `tokens`. `raw_args` is the untokenised remainder that
/// literal rules bind.
pub fn resolve_tokens(
    rules: &[ParameterRule],
    tokens: &[String],
    raw_args: &str,
) -> ArgumentResult<Args> {
    let mut args = Args::new();
    let mut remaining = tokens.iter();

    for rule in rules {
        let rest = remaining.as_slice();

        if rest.is_empty() {
            if rule.is_required() {
                return Err(ArgumentError::Missing {
                    rule: rule.name().to_string(),
                });
            }
            args.bind(rule.name(), rule.default_value().cloned());
            if rule.is_repeatable() || rule.is_literal() {
                break;
            }
            continue;
        }

        if rule.is_repeatable() {
            let values = rest
                .iter()
                .map(|token| coerce(rule, token))
                .collect::<ArgumentResult<Vec<_>>>()?;
            args.bind(rule.name(), Some(ArgValue::List(values)));
            break;
        }

        if rule.is_literal() {
            args.bind(rule.name(), Some(ArgValue::String(raw_args.to_string())));
            break;
        }

        if let Some(token) = remaining.next() {
            args.bind(rule.name(), Some(coerce(rule, token)?));
        }
    }

    Ok(args)
}

fn coerce(rule: &ParameterRule, token: &str) -> ArgumentResult<ArgValue> {
    rule.kind()
        .convert(token)
        .ok_or_else(|| ArgumentError::TypeMismatch {
            token: token.to_string(),
            rule: rule.name().to_string(),
            expected: rule.kind(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::validate;
    use crate::types::ParamType;

    #[test]
    fn test_defaults_fill_trailing_optionals() {
        let rules = validate(["pool", "hello", "poor = house"]).unwrap();
        let args = resolve(&rules, "bored boo").unwrap();

        assert_eq!(args.len(), 3);
        assert_eq!(args.str("pool"), Some("bored"));
        assert_eq!(args.str("hello"), Some("boo"));
        assert_eq!(args.str("poor"), Some("house"));
    }

    #[test]
    fn test_repeatable_consumes_rest() {
        let rules = validate(["foo", "bar*"]).unwrap();
        let args = resolve(&rules, "foo bar baz qux").unwrap();

        assert_eq!(args.str("foo"), Some("foo"));
        assert_eq!(args.strings("bar"), vec!["bar", "baz", "qux"]);
    }

    #[test]
    fn test_required_repeatable_missing() {
        let rules = validate(["foo", "bar*"]).unwrap();
        let err = resolve(&rules, "foo").unwrap_err();
        assert_eq!(err, ArgumentError::Missing { rule: "bar".into() });
    }

    #[test]
    fn test_optional_repeatable_defaults_to_empty() {
        let rules = validate(["foo", "-bar*"]).unwrap();
        let args = resolve(&rules, "foo").unwrap();
        assert_eq!(args.list("bar"), Some(&[][..]));
    }

    #[test]
    fn test_type_mismatch_names_token_rule_and_type() {
        let rules = validate(["foo(int)"]).unwrap();
        let err = resolve(&rules, "hello").unwrap_err();
        assert_eq!(
            err,
            ArgumentError::TypeMismatch {
                token: "hello".into(),
                rule: "foo".into(),
                expected: ParamType::Integer,
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("hello") && msg.contains("foo") && msg.contains("integer"));
    }

    #[test]
    fn test_repeatable_checks_every_token() {
        let rules = validate(["nums(int)*"]).unwrap();
        let args = resolve(&rules, "1 2.7 -3").unwrap();
        assert_eq!(
            args.list("nums"),
            Some(&[ArgValue::Integer(1), ArgValue::Integer(2), ArgValue::Integer(-3)][..])
        );

        let err = resolve(&rules, "1 two 3").unwrap_err();
        assert!(matches!(err, ArgumentError::TypeMismatch { ref token, .. } if token == "two"));
    }

    #[test]
    fn test_literal_binds_raw_text() {
        let rules = validate(["text+"]).unwrap();
        let raw = "  keep   'the'   spacing \"as is\" ";
        let args = resolve(&rules, raw).unwrap();
        assert_eq!(args.str("text"), Some(raw));
    }

    #[test]
    fn test_literal_default_when_empty() {
        let rules = validate(["text+ = nothing"]).unwrap();
        let args = resolve(&rules, "   ").unwrap();
        assert_eq!(args.str("text"), Some("nothing"));
    }

    #[test]
    fn test_optional_without_default_is_unbound() {
        let rules = validate(["a", "-b(int)"]).unwrap();
        let args = resolve(&rules, "x").unwrap();
        assert!(args.contains("b"));
        assert_eq!(args.get("b"), None);
    }

    #[test]
    fn test_quoted_tokens() {
        let rules = validate(["who", "what"]).unwrap();
        let args = resolve(&rules, r#""the cat" 'sat down'"#).unwrap();
        assert_eq!(args.str("who"), Some("the cat"));
        assert_eq!(args.str("what"), Some("sat down"));
    }

    #[test]
    fn test_surplus_tokens_are_ignored() {
        let rules = validate(["one"]).unwrap();
        let args = resolve(&rules, "a b c").unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.str("one"), Some("a"));
    }

    #[test]
    fn test_totality_over_input_lengths() {
        let rules = validate(["a", "b(int)", "-c(bool)", "-d = x", "-rest(num)*"]).unwrap();
        let inputs = ["1 2", "1 2 true", "1 2 false y", "1 2 true y 3 4.5"];
        for input in inputs {
            let args = resolve(&rules, input).unwrap();
            assert_eq!(args.len(), rules.len(), "{input}");
            for rule in &rules {
                assert!(args.contains(rule.name()), "{input}: {}", rule.name());
            }
        }
    }
}
