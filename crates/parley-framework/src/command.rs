//! Command objects.
//!
//! A [`CommandConfig`] is the plain description a bot author writes: triggers,
//! parameter definitions, a description, middleware and a handler.
//! [`Command::from_config`] validates it into an immutable [`Command`] whose
//! handler is already wrapped in the command's own middleware.
//!
//! ```rust
//! use parley_framework::{Command, CommandConfig, Context};
//!
//! let roll = Command::from_config(
//!     CommandConfig::new("roll")
//!         .alias("r")
//!         .parameter("sides(int) = 6 : faces on the die")
//!         .description("Roll a die")
//!         .handler(|ctx: Context| async move {
//!             format!("rolling a d{}", ctx.args().int("sides").unwrap_or(6))
//!         }),
//! )
//! .unwrap();
//!
//! assert_eq!(roll.name(), "roll");
//! assert_eq!(roll.aliases(), ["r"]);
//! assert_eq!(roll.usage(), "roll [sides]");
//! ```

use std::fmt;
use std::future::Future;

use tower::{BoxError, Service, ServiceExt};
use tower::util::BoxCloneSyncService;

use crate::context::Context;
use crate::error::{ArgumentResult, DefinitionError, DefinitionResult};
use crate::handler::{BoxHandler, handler_fn};
use crate::middleware::{Middleware, Next, apply, from_fn};
use crate::parameter::{ParameterDefinition, ParameterRule, validate};
use crate::resolver::resolve;
use crate::response::{IntoReply, Response};
use crate::value::Args;

/// Middleware over the command pipeline.
pub type CommandLayer = Middleware<Context, Response>;

/// The authoring form of a command.
#[derive(Default)]
pub struct CommandConfig {
    triggers: Vec<String>,
    parameters: Vec<ParameterDefinition>,
    description: Option<String>,
    middleware: Vec<CommandLayer>,
    handler: Option<BoxHandler>,
}

impl CommandConfig {
    /// Starts a config whose primary trigger is `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            triggers: vec![name.into()],
            ..Default::default()
        }
    }

    /// Starts a config from an ordered trigger list; the first is the name.
    pub fn with_triggers<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.triggers.push(alias.into());
        self
    }

    pub fn parameter(mut self, definition: impl Into<ParameterDefinition>) -> Self {
        self.parameters.push(definition.into());
        self
    }

    pub fn parameters<I, D>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<ParameterDefinition>,
    {
        self.parameters.extend(definitions.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a layer. Layers run in the order they are added.
    pub fn layer(mut self, layer: CommandLayer) -> Self {
        self.middleware.push(layer);
        self
    }

    /// Sets the handler function.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoReply,
    {
        self.handler = Some(BoxCloneSyncService::new(handler_fn(f)));
        self
    }

    /// Sets the handler to an arbitrary tower service.
    pub fn service<S>(mut self, service: S) -> Self
    where
        S: Service<Context, Response = Response, Error = BoxError> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        self.handler = Some(BoxCloneSyncService::new(service));
        self
    }
}

impl fmt::Debug for CommandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandConfig")
            .field("triggers", &self.triggers)
            .field("parameters", &self.parameters)
            .field("description", &self.description)
            .field("middleware", &self.middleware.len())
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// A validated command with its composed handler.
pub struct Command {
    name: String,
    aliases: Vec<String>,
    parameters: Vec<ParameterRule>,
    description: Option<String>,
    handler: BoxHandler,
}

impl Command {
    /// Validates `config` into a command.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidCommand`] for an empty or blank
    /// trigger list or a missing handler, and the parameter grammar errors
    /// for bad definitions.
    pub fn from_config(config: CommandConfig) -> DefinitionResult<Self> {
        let CommandConfig {
            triggers,
            parameters,
            description,
            middleware,
            handler,
        } = config;

        let mut triggers = triggers.into_iter();
        let name = triggers
            .next()
            .ok_or_else(|| DefinitionError::InvalidCommand("command has no triggers".into()))?;
        let aliases: Vec<String> = triggers.collect();

        for trigger in std::iter::once(&name).chain(&aliases) {
            if trigger.is_empty() || trigger.contains(char::is_whitespace) {
                return Err(DefinitionError::InvalidCommand(format!(
                    "trigger '{trigger}' of command '{name}' must be a single non-empty word"
                )));
            }
        }

        let handler = handler.ok_or_else(|| {
            DefinitionError::InvalidCommand(format!("command '{name}' has no handler"))
        })?;
        let parameters = validate(parameters)?;

        let handler = apply(middleware.into_iter().chain([mark_invoked()])).around(handler);

        Ok(Self {
            name,
            aliases,
            parameters,
            description,
            handler,
        })
    }

    /// The primary trigger.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The name followed by the aliases.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn parameters(&self) -> &[ParameterRule] {
        &self.parameters
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Renders `name <required> [optional] [rest...]`.
    pub fn usage(&self) -> String {
        std::iter::once(self.name.clone())
            .chain(self.parameters.iter().map(ParameterRule::usage))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resolves `raw_args` against this command's parameters.
    pub fn resolve_args(&self, raw_args: &str) -> ArgumentResult<Args> {
        resolve(&self.parameters, raw_args)
    }

    /// The handler with the command's middleware applied.
    pub fn handler(&self) -> BoxHandler {
        self.handler.clone()
    }

    /// Runs the composed handler.
    pub async fn call(&self, ctx: Context) -> Result<Response, BoxError> {
        self.handler.clone().oneshot(ctx).await
    }
}

impl TryFrom<CommandConfig> for Command {
    type Error = DefinitionError;

    fn try_from(config: CommandConfig) -> DefinitionResult<Self> {
        Command::from_config(config)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parameters", &self.parameters)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Innermost layer: records that the user handler was reached.
fn mark_invoked() -> CommandLayer {
    from_fn(|ctx: Context, next: Next<Context, Response>| async move {
        ctx.mark_invoked();
        next.run(ctx).await
    })
}
