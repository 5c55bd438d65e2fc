//! Parameter definitions.
//!
//! A command declares its arguments as a list of definition strings in a
//! small inline-marker grammar:
//!
//! ```text
//! [-|+]name[(type)][*|+][ = default ...][ : description]
//! ```
//!
//! | Definition                         | Meaning                                             |
//! |------------------------------------|-----------------------------------------------------|
//! | `user`                             | required string                                     |
//! | `-count(int)`                      | optional integer, no default                        |
//! | `sides(int) = 6 : faces on the die` | optional integer defaulting to 6, with description |
//! | `choices*`                         | one or more trailing strings                        |
//! | `-tags* = a 'b c'`                 | zero or more strings, defaulting to `["a", "b c"]`  |
//! | `text+`                            | the whole remaining input, verbatim                 |
//!
//! [`parse`] reads one definition into a [`ParameterRule`]; [`validate`]
//! reads a full list and checks the cross-rule invariants. Both run at
//! registration time and return [`DefinitionError`](crate::error::DefinitionError)
//! on authoring mistakes. [`ParameterSpec`] builds the same rules without
//! the text grammar.

mod parser;
mod rule;
mod spec;

pub use parser::{parse, validate, validate_rules};
pub use rule::ParameterRule;
pub use spec::{ParameterDefinition, ParameterSpec};
