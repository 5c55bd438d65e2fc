//! The event loop.
//!
//! A host integration pushes [`HostEvent`]s into the runtime's queue through
//! an [`EventSender`]. The loop takes them off in arrival order, publishes
//! each on the event table, and spawns one dispatch task per routable
//! message so that a slow handler never holds up the queue.
//!
//! ```rust,ignore
//! use parley_runtime::ParleyRuntime;
//!
//! let runtime = ParleyRuntime::builder()
//!     .config_file("parley.toml")
//!     .build()?;
//! runtime.load_command(ping).await?;
//!
//! let events = runtime.sender()?;
//! tokio::spawn(my_host.forward_into(events));
//!
//! // Until Ctrl+C, or until the host drops its sender.
//! runtime.run().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use parley_core::HostEvent;
use parley_framework::{
    Command, CommandConfig, DispatchLayer, DispatchOutcome, Dispatcher, DispatcherBuilder,
    EventPayload, EventTable, LoadError, RegistryError, ServiceContainer,
};

use crate::config::{ConfigLoader, ParleyConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The sending half of the runtime's event queue.
pub type EventSender = mpsc::UnboundedSender<HostEvent>;

/// A snapshot of what the runtime has processed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Host events taken off the queue.
    pub events: u64,
    /// Messages handed to the dispatcher.
    pub dispatched: u64,
    /// Dispatches that ran a handler to completion.
    pub completed: u64,
    /// Dispatches dropped by a filter or by middleware.
    pub filtered: u64,
    /// Every other failed dispatch.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    events: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    filtered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &DispatchOutcome) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome.failure_kind() {
            None => &self.completed,
            Some(kind) if kind.is_filter() => &self.filtered,
            Some(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            events: self.events.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Owns the dispatcher and feeds it host events.
pub struct ParleyRuntime {
    config: ParleyConfig,
    dispatcher: Dispatcher,
    sender: Mutex<Option<EventSender>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>,
    counters: Arc<Counters>,
    running: AtomicBool,
}

impl ParleyRuntime {
    /// Loads configuration from the default locations and builds a runtime.
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from an already loaded configuration.
    ///
    /// Validates the configuration and initializes logging from it.
    pub fn from_config(config: &ParleyConfig) -> RuntimeResult<Self> {
        Self::builder().config(config.clone()).build()
    }

    /// Wraps a dispatcher that was configured by hand.
    pub fn with_dispatcher(config: ParleyConfig, dispatcher: Dispatcher) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            dispatcher,
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            counters: Arc::new(Counters::default()),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn events(&self) -> &EventTable {
        self.dispatcher.events()
    }

    pub fn services(&self) -> &ServiceContainer {
        self.dispatcher.services()
    }

    pub fn stats(&self) -> RuntimeStats {
        self.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn load_command(&self, config: CommandConfig) -> Result<Arc<Command>, LoadError> {
        self.dispatcher.load_command(config).await
    }

    pub async fn unload_command(&self, key: &str) -> Result<Arc<Command>, RegistryError> {
        self.dispatcher.unload_command(key).await
    }

    /// Returns a handle for pushing host events.
    ///
    /// Senders must be taken before [`run`](Self::run): once the loop starts
    /// it stops as soon as the last outstanding sender is dropped.
    pub fn sender(&self) -> RuntimeResult<EventSender> {
        self.sender.lock().clone().ok_or(RuntimeError::AlreadyRunning)
    }

    /// Handles one event immediately, bypassing the queue, and waits for its
    /// dispatch to finish.
    pub async fn process(&self, event: HostEvent) -> Option<DispatchOutcome> {
        if self.announce(&event).await {
            route(self.dispatcher.clone(), self.counters.clone(), event).await
        } else {
            None
        }
    }

    /// Runs until Ctrl+C, SIGTERM, or until every sender has been dropped.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or every sender has been dropped.
    ///
    /// Dispatches still in flight when the loop ends are awaited.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyRunning)?;
        self.sender.lock().take();
        self.running.store(true, Ordering::SeqCst);

        info!(
            prefix = ?self.config.prefix,
            commands = self.dispatcher.commands().len(),
            "Parley runtime is running"
        );

        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Some(event) => {
                        if self.announce(&event).await {
                            tasks.spawn(route(self.dispatcher.clone(), self.counters.clone(), event));
                        }
                    }
                    None => {
                        debug!("All event senders dropped");
                        break;
                    }
                },
                () = &mut shutdown => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
            }
        }

        let in_flight = tasks.len();
        if in_flight > 0 {
            debug!(in_flight, "Waiting for in-flight dispatches");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        self.running.store(false, Ordering::SeqCst);
        let stats = self.stats();
        info!(
            events = stats.events,
            completed = stats.completed,
            failed = stats.failed,
            "Parley runtime stopped"
        );
        Ok(())
    }

    /// Publishes `event` on the event table. Returns `true` if it carries a
    /// message for the dispatcher.
    async fn announce(&self, event: &HostEvent) -> bool {
        self.counters.events.fetch_add(1, Ordering::Relaxed);
        trace!(event = event.name(), "Host event received");

        if let HostEvent::Ready(client) = event {
            info!(user_id = %client.user_id, name = %client.name, "Bot is ready");
            self.dispatcher.set_client(client.clone());
        }

        self.dispatcher
            .events()
            .emit(EventPayload::Host(event.clone()))
            .await;

        event.routable_message().is_some()
    }
}

impl fmt::Debug for ParleyRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParleyRuntime")
            .field("prefix", &self.config.prefix)
            .field("commands", &self.dispatcher.commands().len())
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

async fn route(
    dispatcher: Dispatcher,
    counters: Arc<Counters>,
    event: HostEvent,
) -> Option<DispatchOutcome> {
    let outcome = dispatcher.dispatch_event(&event).await?;
    counters.record(&outcome);
    Some(outcome)
}

fn log_join(joined: Result<Option<DispatchOutcome>, tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Dispatch task panicked");
    }
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    ctrl_c().await;
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`ParleyRuntime`].
///
/// Prefix, filter switches and case sensitivity come from the loaded
/// configuration; layers, services and event handlers are added here.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<ParleyConfig>,
    dispatcher: DispatcherBuilder,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            dispatcher: Dispatcher::builder(),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides a single dotted configuration key.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Uses `config` as-is instead of loading one.
    pub fn config(mut self, config: ParleyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Skips installing the global tracing subscriber.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn layer(mut self, layer: DispatchLayer) -> Self {
        self.dispatcher = self.dispatcher.layer(layer);
        self
    }

    pub fn services(mut self, services: ServiceContainer) -> Self {
        self.dispatcher = self.dispatcher.services(services);
        self
    }

    pub fn events(mut self, events: EventTable) -> Self {
        self.dispatcher = self.dispatcher.events(events);
        self
    }

    pub fn build(self) -> RuntimeResult<ParleyRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let dispatcher = self
            .dispatcher
            .prefix(config.to_prefix())
            .options(config.dispatch_options())
            .case_sensitive(config.dispatch.case_sensitive)
            .build();

        info!(
            prefix = ?config.prefix,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(ParleyRuntime::with_dispatcher(config, dispatcher))
    }
}
