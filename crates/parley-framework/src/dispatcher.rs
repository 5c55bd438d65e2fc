//! The message dispatcher.
//!
//! [`Dispatcher::dispatch`] drives one message through the routing state
//! machine:
//!
//! ```text
//! received ─▶ event filter ─▶ prefix ─▶ parse ─▶ lookup ─▶ dispatcher layers
//!          ─▶ argument resolution ─▶ command layers ─▶ handler
//!          ─▶ classification ─▶ emission
//! ```
//!
//! The first step that cannot continue ends the dispatch with a
//! [`DispatchFailure`] tagged by [`FailureKind`]. Failures are returned as a
//! [`DispatchOutcome`], published on the [`EventTable`] under
//! [`EventPayload::DISPATCH_FAIL`], and logged; they are never raised to the
//! caller.
//!
//! Dispatcher-level layers run before argument resolution, so they see an
//! empty [`Context::args`]. Command-level layers run after it.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use tower::{BoxError, ServiceExt, service_fn};
use tracing::{Instrument, Level, debug, span, trace, warn};

use parley_core::{ClientInfo, HostEvent, Message};

use crate::command::{Command, CommandConfig};
use crate::context::Context;
use crate::error::{ArgumentError, HandlerError, LoadError, RegistryResult};
use crate::events::{EventPayload, EventTable};
use crate::middleware::{BoxService, Middleware, apply};
use crate::registry::CommandRegistry;
use crate::response::Response;
use crate::service::ServiceContainer;
use crate::signature::{ParsedCommand, Prefix, PrefixMatcher};

/// Middleware over the whole dispatch pipeline.
pub type DispatchLayer = Middleware<Context, Response>;

/// Why a dispatch did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The host event is not one that should trigger commands.
    EventFiltered,
    /// The message does not start with a configured prefix.
    PrefixFiltered,
    /// Nothing followed the prefix.
    ParseCommand,
    /// The arguments do not satisfy the command's parameters.
    ParseArguments,
    /// No command answers to the identifier.
    UnknownCommand,
    /// A layer stopped the pipeline before the handler ran.
    MiddlewareFiltered,
    /// A layer or the handler returned an error.
    HandlerError,
    /// The response has no valid interpretation.
    ClassificationError,
    /// Sending the response failed.
    EmitError,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventFiltered => "event-filtered",
            Self::PrefixFiltered => "prefix-filtered",
            Self::ParseCommand => "parse-command",
            Self::ParseArguments => "parse-arguments",
            Self::UnknownCommand => "unknown-command",
            Self::MiddlewareFiltered => "middleware-filtered",
            Self::HandlerError => "handler-error",
            Self::ClassificationError => "classification-error",
            Self::EmitError => "emit-error",
        }
    }

    /// Returns `true` for the routine outcomes of messages not meant for the
    /// bot, as opposed to errors.
    pub fn is_filter(self) -> bool {
        matches!(
            self,
            Self::EventFiltered | Self::PrefixFiltered | Self::MiddlewareFiltered
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged dispatch failure.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    pub kind: FailureKind,
    /// The message that was being dispatched.
    pub message: Arc<Message>,
    /// The matched command, once lookup succeeded.
    pub command: Option<String>,
    /// The underlying error, where there is one.
    pub error: Option<Arc<dyn StdError + Send + Sync>>,
}

impl DispatchFailure {
    pub fn new(kind: FailureKind, message: Arc<Message>) -> Self {
        Self {
            kind,
            message,
            command: None,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<BoxError>) -> Self {
        let error: BoxError = error.into();
        self.error = Some(Arc::from(error));
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Returns the underlying error as `E`, if it is one.
    pub fn error_as<E: StdError + 'static>(&self) -> Option<&E> {
        self.error.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch failed ({})", self.kind)?;
        if let Some(command) = &self.command {
            write!(f, " in command '{command}'")?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {error}")?;
        }
        Ok(())
    }
}

impl StdError for DispatchFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// The terminal state of one dispatch.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The handler ran and its response was emitted.
    Completed {
        command: String,
        /// Whether anything was sent.
        emitted: bool,
    },
    Failed(DispatchFailure),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn failure(&self) -> Option<&DispatchFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Completed { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure().map(|f| f.kind)
    }
}

/// Message-level filter switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Drop messages from other automated accounts.
    pub ignore_bots: bool,
    /// Drop messages the bot sent itself.
    pub ignore_self: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            ignore_bots: true,
            ignore_self: true,
        }
    }
}

struct Identity {
    client: Option<ClientInfo>,
    matcher: Arc<PrefixMatcher>,
}

struct Inner {
    prefix: Prefix,
    identity: RwLock<Identity>,
    commands: CommandRegistry,
    services: ServiceContainer,
    events: EventTable,
    pipeline: BoxService<Context, Response>,
    layers: usize,
    options: DispatchOptions,
}

/// Routes messages to commands. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Dispatcher {
    /// A dispatcher with the `!` prefix and empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn prefix(&self) -> &Prefix {
        &self.inner.prefix
    }

    pub fn options(&self) -> DispatchOptions {
        self.inner.options
    }

    pub fn client(&self) -> Option<ClientInfo> {
        self.inner.identity.read().client.clone()
    }

    /// Records the bot identity and recompiles the prefix for it.
    pub fn set_client(&self, client: ClientInfo) {
        let matcher = Arc::new(self.inner.prefix.compile(Some(&client)));
        debug!(user_id = %client.user_id, "Client identity set");
        *self.inner.identity.write() = Identity {
            client: Some(client),
            matcher,
        };
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.inner.commands
    }

    pub fn services(&self) -> &ServiceContainer {
        &self.inner.services
    }

    pub fn events(&self) -> &EventTable {
        &self.inner.events
    }

    /// Builds a command from `config`, loads it, and emits `commandLoad`.
    pub async fn load_command(&self, config: CommandConfig) -> Result<Arc<Command>, LoadError> {
        let command = self.inner.commands.load(Command::from_config(config)?)?;
        self.inner
            .events
            .emit(EventPayload::CommandLoaded(command.name().to_string()))
            .await;
        Ok(command)
    }

    /// Unloads the command answering to `key` and emits `commandUnload`.
    pub async fn unload_command(&self, key: &str) -> RegistryResult<Arc<Command>> {
        let command = self.inner.commands.unload(key)?;
        self.inner
            .events
            .emit(EventPayload::CommandUnloaded(command.name().to_string()))
            .await;
        Ok(command)
    }

    /// Dispatches a newly created message.
    pub async fn dispatch(&self, message: Arc<Message>) -> DispatchOutcome {
        self.route(message, None).await
    }

    /// Dispatches the message carried by a host event.
    ///
    /// Returns `None` for events that carry nothing to route. Edits are
    /// routed by their new content and filtered when the content is
    /// unchanged.
    pub async fn dispatch_event(&self, event: &HostEvent) -> Option<DispatchOutcome> {
        match event {
            HostEvent::MessageCreate(message) => Some(self.route(message.clone(), None).await),
            HostEvent::MessageUpdate { before, after } => {
                Some(self.route(after.clone(), Some(before.as_ref())).await)
            }
            HostEvent::Ready(_) | HostEvent::MessageDelete(_) => None,
        }
    }

    async fn route(&self, message: Arc<Message>, before: Option<&Message>) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            message_id = %message.id,
            channel = %message.channel.id()
        );

        async move {
            let outcome = self.run(message, before).await;
            match &outcome {
                DispatchOutcome::Completed { command, emitted } => {
                    debug!(%command, emitted, "Dispatch completed");
                }
                DispatchOutcome::Failed(failure) => {
                    log_failure(failure);
                    self.inner
                        .events
                        .emit(EventPayload::DispatchFailed(failure.clone()))
                        .await;
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, message: Arc<Message>, before: Option<&Message>) -> DispatchOutcome {
        let fail = |kind| DispatchOutcome::Failed(DispatchFailure::new(kind, message.clone()));

        if self.is_filtered_event(&message, before) {
            return fail(FailureKind::EventFiltered);
        }

        let matcher = self.inner.identity.read().matcher.clone();
        let parsed = match ParsedCommand::from_message(&message.content, &matcher) {
            None => return fail(FailureKind::PrefixFiltered),
            Some(Err(e)) => {
                return DispatchOutcome::Failed(
                    DispatchFailure::new(FailureKind::ParseCommand, message.clone()).with_error(e),
                );
            }
            Some(Ok(parsed)) => parsed,
        };

        let Some(command) = self.inner.commands.get(&parsed.identifier) else {
            let failure = DispatchFailure::new(FailureKind::UnknownCommand, message.clone())
                .with_command(parsed.identifier);
            return DispatchOutcome::Failed(failure);
        };
        let name = command.name().to_string();
        let failed = |kind, error: Option<BoxError>| {
            let failure = DispatchFailure::new(kind, message.clone()).with_command(name.clone());
            DispatchOutcome::Failed(match error {
                Some(error) => failure.with_error(error),
                None => failure,
            })
        };

        trace!(command = %name, identifier = %parsed.identifier, "Command matched");
        let ctx = Context::new(message.clone(), parsed, command, self.clone());

        let pipeline = self.inner.pipeline.clone().oneshot(ctx.clone());
        let result = match AssertUnwindSafe(pipeline).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::new(format!(
                "handler panicked: {}",
                panic_message(&*panic)
            ))
            .into()),
        };

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                let kind = if error.downcast_ref::<ArgumentError>().is_some() {
                    FailureKind::ParseArguments
                } else {
                    FailureKind::HandlerError
                };
                return failed(kind, Some(error));
            }
        };

        let invoked = ctx.handler_invoked();
        if !invoked && response.is_empty() {
            return failed(FailureKind::MiddlewareFiltered, None);
        }

        let classified = match response.classify(&mut rand::thread_rng()) {
            Ok(classified) => classified,
            Err(error) => return failed(FailureKind::ClassificationError, Some(error.into())),
        };

        let emitted = match classified.emit(&ctx).await {
            Ok(emitted) => emitted,
            Err(error) => return failed(FailureKind::EmitError, Some(error.into())),
        };

        if invoked {
            DispatchOutcome::Completed {
                command: name,
                emitted,
            }
        } else {
            // A layer answered in place of the handler.
            failed(FailureKind::MiddlewareFiltered, None)
        }
    }

    fn is_filtered_event(&self, message: &Message, before: Option<&Message>) -> bool {
        if before.is_some_and(|before| before.content == message.content) {
            trace!("Edit left content unchanged");
            return true;
        }
        let options = self.inner.options;
        if options.ignore_self
            && let Some(client) = &self.inner.identity.read().client
            && client.user_id == message.author.id
        {
            trace!("Message sent by this bot");
            return true;
        }
        if options.ignore_bots && message.author.bot {
            trace!(author = %message.author.id, "Message sent by a bot");
            return true;
        }
        false
    }
}

/// Innermost step of the dispatch pipeline: bind arguments, then run the
/// command's own layers and handler.
async fn run_command(ctx: Context) -> Result<Response, BoxError> {
    let args = ctx.command().resolve_args(&ctx.parsed().raw_args)?;
    ctx.bind_args(args);
    let command = ctx.command().clone();
    command.call(ctx).await
}

fn log_failure(failure: &DispatchFailure) {
    let command = failure.command.as_deref().unwrap_or("-");
    match failure.kind {
        FailureKind::EventFiltered | FailureKind::PrefixFiltered => {
            trace!(kind = %failure.kind, "Message ignored");
        }
        FailureKind::MiddlewareFiltered | FailureKind::UnknownCommand => {
            debug!(kind = %failure.kind, command, "Dispatch stopped");
        }
        _ => match &failure.error {
            Some(error) => warn!(kind = %failure.kind, command, %error, "Dispatch failed"),
            None => warn!(kind = %failure.kind, command, "Dispatch failed"),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.inner.prefix)
            .field("client", &self.client())
            .field("commands", &self.inner.commands.len())
            .field("layers", &self.inner.layers)
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    prefix: Option<Prefix>,
    client: Option<ClientInfo>,
    commands: Option<CommandRegistry>,
    case_sensitive: bool,
    services: Option<ServiceContainer>,
    events: Option<EventTable>,
    layers: Vec<DispatchLayer>,
    options: DispatchOptions,
}

impl DispatcherBuilder {
    pub fn prefix(mut self, prefix: impl Into<Prefix>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the bot identity up front, e.g. in tests.
    pub fn client(mut self, client: ClientInfo) -> Self {
        self.client = Some(client);
        self
    }

    /// Uses an existing registry instead of a fresh one.
    pub fn commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Case sensitivity of the registry created when none is supplied.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn services(mut self, services: ServiceContainer) -> Self {
        self.services = Some(services);
        self
    }

    pub fn events(mut self, events: EventTable) -> Self {
        self.events = Some(events);
        self
    }

    /// Appends a dispatcher-level layer. Layers run in the order added,
    /// before any command-level layer.
    pub fn layer(mut self, layer: DispatchLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ignore_bots(mut self, ignore: bool) -> Self {
        self.options.ignore_bots = ignore;
        self
    }

    pub fn ignore_self(mut self, ignore: bool) -> Self {
        self.options.ignore_self = ignore;
        self
    }

    pub fn build(self) -> Dispatcher {
        let prefix = self.prefix.unwrap_or_default();
        let matcher = Arc::new(prefix.compile(self.client.as_ref()));
        let layers = self.layers.len();
        let pipeline = apply(self.layers).around(service_fn(run_command));

        Dispatcher {
            inner: Arc::new(Inner {
                prefix,
                identity: RwLock::new(Identity {
                    client: self.client,
                    matcher,
                }),
                commands: self
                    .commands
                    .unwrap_or_else(|| CommandRegistry::with_case_sensitivity(self.case_sensitive)),
                services: self.services.unwrap_or_default(),
                events: self.events.unwrap_or_default(),
                pipeline,
                layers,
                options: self.options,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use parley_core::{Author, Channel, EmitResult};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Channel for Recorder {
        fn id(&self) -> &str {
            "test"
        }

        async fn send(&self, text: &str) -> EmitResult<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    fn message(channel: &Arc<Recorder>, content: &str) -> Arc<Message> {
        Arc::new(Message::new("m1", content, Author::new("u1", "user"), channel.clone()))
    }

    async fn dispatcher_with_ping() -> Dispatcher {
        let dispatcher = Dispatcher::builder().client(ClientInfo::new("bot", "bot")).build();
        dispatcher
            .load_command(CommandConfig::new("ping").handler(|_ctx: Context| async { "pong" }))
            .await
            .unwrap();
        dispatcher
    }

    #[tokio::test]
    async fn test_happy_path() {
        let channel = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with_ping().await;

        let outcome = dispatcher.dispatch(message(&channel, "!ping")).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Completed { ref command, emitted: true } if command == "ping"
        ));
        assert_eq!(*channel.sent.lock(), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_filter_kinds() {
        let channel = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with_ping().await;

        let kind = |outcome: DispatchOutcome| outcome.failure_kind();
        assert_eq!(
            kind(dispatcher.dispatch(message(&channel, "hello")).await),
            Some(FailureKind::PrefixFiltered)
        );
        assert_eq!(
            kind(dispatcher.dispatch(message(&channel, "!   ")).await),
            Some(FailureKind::ParseCommand)
        );
        assert_eq!(
            kind(dispatcher.dispatch(message(&channel, "!nope")).await),
            Some(FailureKind::UnknownCommand)
        );

        let own = Arc::new(Message::new("m2", "!ping", Author::new("bot", "bot"), channel.clone()));
        assert_eq!(
            kind(dispatcher.dispatch(own).await),
            Some(FailureKind::EventFiltered)
        );
        assert!(channel.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_edit_is_filtered() {
        let channel = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with_ping().await;

        let same = HostEvent::MessageUpdate {
            before: message(&channel, "!ping"),
            after: message(&channel, "!ping"),
        };
        assert_eq!(
            dispatcher.dispatch_event(&same).await.and_then(|o| o.failure_kind()),
            Some(FailureKind::EventFiltered)
        );

        let edited = HostEvent::MessageUpdate {
            before: message(&channel, "!pnig"),
            after: message(&channel, "!ping"),
        };
        assert!(dispatcher.dispatch_event(&edited).await.unwrap().is_completed());
        assert_eq!(*channel.sent.lock(), vec!["pong"]);

        let ready = HostEvent::Ready(ClientInfo::new("bot", "bot"));
        assert!(dispatcher.dispatch_event(&ready).await.is_none());
    }

    #[test]
    fn test_failure_kind_names() {
        assert_eq!(FailureKind::ParseArguments.to_string(), "parse-arguments");
        assert_eq!(FailureKind::ClassificationError.to_string(), "classification-error");
        assert!(FailureKind::PrefixFiltered.is_filter());
        assert!(!FailureKind::HandlerError.is_filter());
    }
}
