use super::parser::{RuleParts, build_rule, parse};
use super::rule::ParameterRule;
use crate::error::DefinitionResult;
use crate::types::ParamType;

/// Structured alternative to the definition grammar.
///
/// Goes through the same checks as [`parse`], so both forms yield identical
/// rules.
///
/// ```rust
/// use parley_framework::parameter::{parse, ParameterSpec};
/// use parley_framework::ParamType;
///
/// let built = ParameterSpec::new("sides")
///     .kind(ParamType::Integer)
///     .default("6")
///     .description("faces on the die")
///     .build()
///     .unwrap();
/// assert_eq!(built, parse("sides(int) = 6 : faces on the die").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterSpec {
    name: String,
    kind: Option<ParamType>,
    optional: bool,
    repeatable: bool,
    literal: bool,
    defaults: Option<Vec<String>>,
    description: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn kind(mut self, kind: ParamType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    /// Adds one raw default token. Call repeatedly for repeatable rules.
    pub fn default(mut self, token: impl Into<String>) -> Self {
        self.defaults.get_or_insert_with(Vec::new).push(token.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validates the spec into a rule.
    pub fn build(self) -> DefinitionResult<ParameterRule> {
        let definition = self.name.clone();
        build_rule(RuleParts {
            definition: &definition,
            name: self.name,
            kind: self.kind,
            optional: self.optional,
            repeatable: self.repeatable,
            literal: self.literal,
            defaults: self.defaults,
            description: self.description,
        })
    }
}

/// Anything a command configuration accepts as a parameter definition.
#[derive(Debug, Clone)]
pub enum ParameterDefinition {
    /// A definition string in the inline-marker grammar.
    Text(String),
    /// A structured definition.
    Spec(ParameterSpec),
    /// An already-validated rule.
    Rule(ParameterRule),
}

impl ParameterDefinition {
    pub(crate) fn into_rule(self) -> DefinitionResult<ParameterRule> {
        match self {
            Self::Text(text) => parse(&text),
            Self::Spec(spec) => spec.build(),
            Self::Rule(rule) => Ok(rule),
        }
    }
}

impl From<&str> for ParameterDefinition {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ParameterDefinition {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<ParameterSpec> for ParameterDefinition {
    fn from(spec: ParameterSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<ParameterRule> for ParameterDefinition {
    fn from(rule: ParameterRule) -> Self {
        Self::Rule(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DefinitionError;
    use crate::parameter::validate;

    #[test]
    fn test_spec_matches_grammar() {
        let spec = ParameterSpec::new("tags").optional().repeatable().default("a").default("b c");
        assert_eq!(spec.build().unwrap(), parse("-tags* = a 'b c'").unwrap());
    }

    #[test]
    fn test_spec_runs_same_checks() {
        let err = ParameterSpec::new("n")
            .kind(ParamType::Integer)
            .default("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DefaultType { .. }));

        let err = ParameterSpec::new("")
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingName { .. }));
    }

    #[test]
    fn test_spec_names_follow_grammar() {
        for name in ["two words", "-flag", "a(b)", "x*", "k=v", "a:b"] {
            assert!(
                matches!(
                    ParameterSpec::new(name).build(),
                    Err(DefinitionError::Malformed { .. })
                ),
                "{name:?}"
            );
        }

        let rule = ParameterSpec::new("max-len").kind(ParamType::Integer).build().unwrap();
        assert_eq!(parse(&rule.to_string()).unwrap(), rule);
    }

    #[test]
    fn test_mixed_definition_list() {
        let rules = validate(vec![
            ParameterDefinition::from("user"),
            ParameterSpec::new("count").kind(ParamType::Integer).optional().into(),
        ])
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].kind(), ParamType::Integer);
    }
}
