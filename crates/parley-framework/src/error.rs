//! Error types for the Parley framework.
//!
//! Errors fall into three families that are surfaced differently:
//!
//! - [`DefinitionError`]: a mistake in command authoring. Returned from
//!   registration calls and never swallowed.
//! - [`ArgumentError`] and [`ClassificationError`]: problems with one incoming
//!   message. The dispatcher turns them into a tagged dispatch failure.
//! - [`RegistryError`] and [`ServiceError`]: rejected mutations of shared
//!   registries. The registry is left unchanged.

use thiserror::Error;

use crate::types::ParamType;

/// Errors raised while parsing or validating command definitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    /// The definition has no parameter name.
    #[error("parameter definition '{definition}' has no name")]
    MissingName { definition: String },

    /// The signature part of the definition could not be read.
    #[error("malformed parameter definition '{definition}' near '{token}'")]
    Malformed { definition: String, token: String },

    /// The parenthesised type tag is not a known type.
    #[error("unknown parameter type '{token}' in '{definition}'")]
    UnknownType { definition: String, token: String },

    /// A rule was marked both repeatable (`*`) and literal (`+`).
    #[error("parameter '{name}' cannot be both repeatable and literal")]
    RepeatableLiteral { name: String },

    /// A literal rule was declared with a non-string type.
    #[error("literal parameter '{name}' must have type string, found {found}")]
    LiteralType { name: String, found: ParamType },

    /// A default segment (`name =`) with no value.
    #[error("parameter '{name}' has an empty default value")]
    EmptyDefault { name: String },

    /// A non-repeatable rule was given several default values.
    #[error("parameter '{name}' accepts a single default value, found {count}: '{defaults}'")]
    TooManyDefaults {
        name: String,
        count: usize,
        defaults: String,
    },

    /// A default value does not match the declared type.
    #[error("default value '{token}' of parameter '{name}' is not a valid {expected}")]
    DefaultType {
        name: String,
        token: String,
        expected: ParamType,
    },

    /// The default segment has an unbalanced quote.
    #[error("unterminated quote in default value of parameter '{name}': '{defaults}'")]
    UnterminatedQuote { name: String, defaults: String },

    /// Two rules in one command share a name.
    #[error("duplicate parameter name '{name}'")]
    DuplicateParameter { name: String },

    /// A literal rule is present alongside other rules, or more than once.
    #[error("literal parameter '{name}' must be the only parameter of its command")]
    LiteralNotAlone { name: String },

    /// A repeatable rule is followed by another rule, or appears twice.
    #[error("repeatable parameter '{name}' must be the last parameter")]
    RepeatableNotLast { name: String },

    /// A required rule follows an optional one.
    #[error("required parameter '{name}' cannot follow optional parameter '{after}'")]
    RequiredAfterOptional { name: String, after: String },

    /// The command configuration failed validation.
    #[error("invalid command configuration: {0}")]
    InvalidCommand(String),
}

/// Result type for definition-time operations.
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Errors raised while matching input tokens against parameter rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    /// A required rule had no token left to consume.
    #[error("missing required argument '{rule}'")]
    Missing { rule: String },

    /// A token could not be coerced into the rule's type.
    #[error("argument '{token}' for '{rule}' is not a valid {expected}")]
    TypeMismatch {
        token: String,
        rule: String,
        expected: ParamType,
    },
}

/// Result type for argument resolution.
pub type ArgumentResult<T> = Result<T, ArgumentError>;

/// Errors raised by the command registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An entry with this primary name already exists.
    #[error("command '{0}' is already registered")]
    DuplicateName(String),

    /// The key is already taken by another entry, as a name or an alias.
    #[error("alias '{alias}' is already in use by '{owner}'")]
    DuplicateAlias { alias: String, owner: String },

    /// No entry answers to this key.
    #[error("command '{0}' is not registered")]
    NotFound(String),

    /// The key is a primary name, not an alias.
    #[error("'{0}' is a command name, not an alias")]
    NotAnAlias(String),
}

/// Result type for registry mutations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by the service container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A binding with this key already exists.
    #[error("service '{0}' is already bound")]
    DuplicateKey(String),

    /// The alias is already taken by another binding.
    #[error("alias '{alias}' is already in use by '{owner}'")]
    AliasConflict { alias: String, owner: String },

    /// No binding answers to this key.
    #[error("service '{0}' is not bound")]
    NotFound(String),

    /// The bound value is not of the requested type.
    #[error("service '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Result type for service container operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised while reducing a handler's return value to an action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    /// A random choice landed on an element that is not text.
    #[error("choice element must be a string, found {found}")]
    NonStringChoice { found: &'static str },

    /// A random choice was requested from an empty list.
    #[error("cannot choose a response from an empty list")]
    EmptyChoice,

    /// The value has no response interpretation.
    #[error("unrecognised response value: {found}")]
    Unrecognized { found: String },
}

/// A plain-message error for handlers without a richer error type.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The message matched a prefix but carried no command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("message contains no command after the prefix")]
pub struct EmptyCommand;

/// Errors raised while building and registering a command in one step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
