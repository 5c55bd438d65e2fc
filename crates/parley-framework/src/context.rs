//! The per-dispatch context.
//!
//! One [`Context`] is built for every message that reaches a command. It is
//! passed by value through dispatcher middleware, command middleware and the
//! handler, and handed by reference to custom responders. Cloning is cheap:
//! every field is shared, so state stored by an outer layer is visible to the
//! layers and handler inside it.
//!
//! The context carries everything a handler may need explicitly: the message,
//! the matched command, resolved arguments, the registries, and the
//! [`Dispatcher`] itself for routing synthesised messages.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use parley_core::{Author, ClientInfo, EmitResult, Embed, Message};

use crate::command::Command;
use crate::dispatcher::Dispatcher;
use crate::events::EventTable;
use crate::registry::CommandRegistry;
use crate::service::ServiceContainer;
use crate::signature::ParsedCommand;
use crate::value::Args;

type StateMap = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

static NO_ARGS: LazyLock<Args> = LazyLock::new(Args::new);

/// Everything known about one dispatch.
#[derive(Clone)]
pub struct Context {
    message: Arc<Message>,
    parsed: Arc<ParsedCommand>,
    command: Arc<Command>,
    args: Arc<OnceLock<Args>>,
    dispatcher: Dispatcher,
    state: Arc<Mutex<StateMap>>,
    invoked: Arc<AtomicBool>,
}

impl Context {
    pub(crate) fn new(
        message: Arc<Message>,
        parsed: ParsedCommand,
        command: Arc<Command>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            message,
            parsed: Arc::new(parsed),
            command,
            args: Arc::new(OnceLock::new()),
            dispatcher,
            state: Arc::new(Mutex::new(HashMap::new())),
            invoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Binds resolved arguments. Every clone of this context sees them.
    pub(crate) fn bind_args(&self, args: Args) {
        // A layer that runs the chain twice resolves the same input twice;
        // the first binding stands.
        let _ = self.args.set(args);
    }

    pub(crate) fn mark_invoked(&self) {
        self.invoked.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the command's own handler has started.
    pub fn handler_invoked(&self) -> bool {
        self.invoked.load(Ordering::SeqCst)
    }

    // ─── Message ─────────────────────────────────────────────────────────────

    pub fn message(&self) -> &Arc<Message> {
        &self.message
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn author(&self) -> &Author {
        &self.message.author
    }

    /// Sends plain text to the message's channel.
    pub async fn reply(&self, text: &str) -> EmitResult<()> {
        self.message.reply(text).await
    }

    pub async fn reply_embed(&self, embed: &Embed) -> EmitResult<()> {
        self.message.reply_embed(embed).await
    }

    // ─── Command ─────────────────────────────────────────────────────────────

    pub fn parsed(&self) -> &ParsedCommand {
        &self.parsed
    }

    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Resolved arguments. Empty while dispatcher-level middleware runs.
    pub fn args(&self) -> &Args {
        self.args.get().unwrap_or(&NO_ARGS)
    }

    // ─── Shared handles ──────────────────────────────────────────────────────

    /// The bot identity, once the host reported it.
    pub fn client(&self) -> Option<ClientInfo> {
        self.dispatcher.client()
    }

    pub fn commands(&self) -> &CommandRegistry {
        self.dispatcher.commands()
    }

    pub fn services(&self) -> &ServiceContainer {
        self.dispatcher.services()
    }

    pub fn events(&self) -> &EventTable {
        self.dispatcher.events()
    }

    /// The dispatcher running this context, for re-dispatching messages.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ─── State ───────────────────────────────────────────────────────────────

    /// Stores a value for the rest of this dispatch. One value per type;
    /// later calls overwrite.
    pub fn set_state<T: Send + Sync + 'static>(&self, value: T) {
        self.state.lock().insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get_state<T: Clone + 'static>(&self) -> Option<T> {
        self.state
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn has_state<T: 'static>(&self) -> bool {
        self.state.lock().contains_key(&TypeId::of::<T>())
    }

    pub fn take_state<T: 'static>(&self) -> Option<T> {
        self.state
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("message", &self.message)
            .field("command", &self.command.name())
            .field("args", self.args())
            .field("handler_invoked", &self.handler_invoked())
            .finish_non_exhaustive()
    }
}
