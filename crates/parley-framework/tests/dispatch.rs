//! End-to-end dispatch through registries, middleware and classification.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio_test::assert_ok;

use parley_core::{Author, Channel, ClientInfo, Embed, EmitResult, Message};
use parley_framework::{
    ArgumentError, BoxError, ClassificationError, CommandConfig, Context, DispatchOutcome,
    Dispatcher, EventPayload, FailureKind, HandlerError, Next, Responder, Response, from_fn,
};

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Channel for Recorder {
    fn id(&self) -> &str {
        "recorder"
    }

    async fn send(&self, text: &str) -> EmitResult<()> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }
}

struct Harness {
    dispatcher: Dispatcher,
    channel: Arc<Recorder>,
}

impl Harness {
    fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            channel: Arc::new(Recorder::default()),
        }
    }

    fn message(&self, content: &str) -> Arc<Message> {
        Arc::new(Message::new(
            "1",
            content,
            Author::new("user", "user"),
            self.channel.clone(),
        ))
    }

    async fn send(&self, content: &str) -> DispatchOutcome {
        self.dispatcher.dispatch(self.message(content)).await
    }

    fn sent(&self) -> Vec<String> {
        self.channel.sent.lock().clone()
    }
}

#[tokio::test]
async fn test_arguments_reach_handler() {
    let h = Harness::new(Dispatcher::new());
    assert_ok!(
        h.dispatcher
            .load_command(
                CommandConfig::new("greet")
                    .parameter("name")
                    .parameter("greeting = hello")
                    .handler(|ctx: Context| async move {
                        let args = ctx.args();
                        format!(
                            "{}, {}",
                            args.str("greeting").unwrap_or_default(),
                            args.str("name").unwrap_or_default()
                        )
                    }),
            )
            .await
    );

    assert!(h.send("!greet bob").await.is_completed());
    assert!(h.send("!GREET 'mary ann' hi").await.is_completed());
    assert_eq!(h.sent(), ["hello, bob", "hi, mary ann"]);
}

#[tokio::test]
async fn test_argument_errors_are_tagged() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(
            CommandConfig::new("add")
                .parameter("a(int)")
                .parameter("b(int)")
                .handler(|ctx: Context| async move {
                    let args = ctx.args();
                    (args.int("a").unwrap_or(0) + args.int("b").unwrap_or(0)).to_string()
                }),
        )
        .await
        .unwrap();

    let missing = h.send("!add 1").await;
    let failure = missing.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::ParseArguments);
    assert_eq!(failure.command.as_deref(), Some("add"));
    assert_eq!(
        failure.error_as::<ArgumentError>(),
        Some(&ArgumentError::Missing { rule: "b".into() })
    );

    let mismatch = h.send("!add 1 hello").await;
    assert!(matches!(
        mismatch.failure().and_then(|f| f.error_as::<ArgumentError>()),
        Some(ArgumentError::TypeMismatch { token, .. }) if token == "hello"
    ));

    assert!(h.send("!add 2 0x10").await.is_completed());
    assert_eq!(h.sent(), ["18"]);
}

#[tokio::test]
async fn test_handler_errors_become_failures() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(CommandConfig::new("boom").handler(|_ctx: Context| async {
            Err::<String, _>(HandlerError::new("kaboom"))
        }))
        .await
        .unwrap();

    let outcome = h.send("!boom").await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::HandlerError);
    assert_eq!(failure.error.as_ref().unwrap().to_string(), "kaboom");
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_handler_panic_is_a_handler_error() {
    let h = Harness::new(Dispatcher::new());
    let published = Arc::new(Mutex::new(Vec::new()));
    {
        let published = published.clone();
        h.dispatcher
            .events()
            .on(EventPayload::DISPATCH_FAIL, move |payload| {
                let published = published.clone();
                async move {
                    if let EventPayload::DispatchFailed(failure) = payload {
                        published.lock().push(failure.kind);
                    }
                }
            });
    }
    h.dispatcher
        .load_command(CommandConfig::new("index").handler(|_ctx: Context| async {
            let empty: Vec<String> = Vec::new();
            empty[3].clone()
        }))
        .await
        .unwrap();

    let dispatcher = h.dispatcher.clone();
    let message = h.message("!index");
    let outcome = assert_ok!(tokio::spawn(async move { dispatcher.dispatch(message).await }).await);

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::HandlerError);
    assert_eq!(failure.command.as_deref(), Some("index"));
    let error = failure.error_as::<HandlerError>().unwrap();
    assert!(error.0.contains("index out of bounds"), "{error}");
    assert_eq!(*published.lock(), [FailureKind::HandlerError]);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_failures_are_published() {
    let h = Harness::new(Dispatcher::new());
    let kinds = Arc::new(Mutex::new(Vec::new()));
    {
        let kinds = kinds.clone();
        h.dispatcher
            .events()
            .on(EventPayload::DISPATCH_FAIL, move |payload| {
                let kinds = kinds.clone();
                async move {
                    if let EventPayload::DispatchFailed(failure) = payload {
                        kinds.lock().push(failure.kind);
                    }
                }
            });
    }

    h.send("no prefix").await;
    h.send("!missing").await;

    assert_eq!(
        *kinds.lock(),
        [FailureKind::PrefixFiltered, FailureKind::UnknownCommand]
    );
}

#[tokio::test]
async fn test_choice_emits_exactly_one_option() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(CommandConfig::new("ask").handler(|_ctx: Context| async { vec!["yes", "no"] }))
        .await
        .unwrap();

    for _ in 0..20 {
        assert!(h.send("!ask").await.is_completed());
    }
    let sent = h.sent();
    assert_eq!(sent.len(), 20);
    assert!(sent.iter().all(|s| s == "yes" || s == "no"));
}

#[tokio::test]
async fn test_non_string_choice_is_a_classification_error() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(CommandConfig::new("bad").handler(|_ctx: Context| async { json!([1, 2, 3]) }))
        .await
        .unwrap();

    for _ in 0..5 {
        let outcome = h.send("!bad").await;
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::ClassificationError);
        assert!(matches!(
            failure.error_as::<ClassificationError>(),
            Some(ClassificationError::NonStringChoice { .. })
        ));
    }
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_mixed_choice_never_completes() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(
            CommandConfig::new("mixed").handler(|_ctx: Context| async { json!(["yes", 1]) }),
        )
        .await
        .unwrap();

    for _ in 0..40 {
        let outcome = h.send("!mixed").await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::ClassificationError));
    }
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_embed_on_text_only_channel_is_an_emit_error() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(
            CommandConfig::new("card")
                .handler(|_ctx: Context| async { Embed::new().title("Card") }),
        )
        .await
        .unwrap();

    assert_eq!(h.send("!card").await.failure_kind(), Some(FailureKind::EmitError));
}

struct Shout;

#[async_trait]
impl Responder for Shout {
    async fn respond(&self, ctx: &Context) -> EmitResult<()> {
        let text = ctx.args().str("text").unwrap_or_default().to_uppercase();
        ctx.reply(&text).await
    }
}

#[tokio::test]
async fn test_custom_responder_gets_the_context() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher
        .load_command(
            CommandConfig::new("shout")
                .parameter("text+")
                .handler(|_ctx: Context| async { Response::custom(Shout) }),
        )
        .await
        .unwrap();

    assert!(h.send("!shout hey there").await.is_completed());
    assert_eq!(h.sent(), ["HEY THERE"]);
}

#[tokio::test]
async fn test_middleware_order_and_short_circuit() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let tracer = |name: &'static str| {
        let trace = trace.clone();
        from_fn(move |ctx: Context, next: Next<Context, Response>| {
            let trace = trace.clone();
            async move {
                trace.lock().push(name);
                next.run(ctx).await
            }
        })
    };

    let dispatcher = Dispatcher::builder()
        .layer(tracer("dispatcher"))
        .build();
    let h = Harness::new(dispatcher);

    h.dispatcher
        .load_command(
            CommandConfig::new("open")
                .layer(tracer("command"))
                .handler(|_ctx: Context| async { "opened" }),
        )
        .await
        .unwrap();
    h.dispatcher
        .load_command(
            CommandConfig::new("locked")
                .layer(from_fn(|ctx: Context, next: Next<Context, Response>| async move {
                    if ctx.author().id == "admin" {
                        next.run(ctx).await
                    } else {
                        Ok::<_, BoxError>(Response::Empty)
                    }
                }))
                .handler(|_ctx: Context| async { "secret" }),
        )
        .await
        .unwrap();

    assert!(h.send("!open").await.is_completed());
    assert_eq!(*trace.lock(), ["dispatcher", "command"]);

    assert_eq!(
        h.send("!locked").await.failure_kind(),
        Some(FailureKind::MiddlewareFiltered)
    );
    assert_eq!(h.sent(), ["opened"]);
}

#[tokio::test]
async fn test_layer_reply_is_sent_but_reported_filtered() {
    let h = Harness::new(
        Dispatcher::builder()
            .layer(from_fn(|_ctx: Context, _next: Next<Context, Response>| async move {
                Ok::<_, BoxError>(Response::text("maintenance"))
            }))
            .build(),
    );
    h.dispatcher
        .load_command(CommandConfig::new("ping").handler(|_ctx: Context| async { "pong" }))
        .await
        .unwrap();

    assert_eq!(
        h.send("!ping").await.failure_kind(),
        Some(FailureKind::MiddlewareFiltered)
    );
    assert_eq!(h.sent(), ["maintenance"]);
}

#[tokio::test]
async fn test_state_flows_from_layer_to_handler() {
    #[derive(Clone)]
    struct Caller(String);

    let h = Harness::new(
        Dispatcher::builder()
            .layer(from_fn(|ctx: Context, next: Next<Context, Response>| async move {
                ctx.set_state(Caller(ctx.author().name.clone()));
                next.run(ctx).await
            }))
            .build(),
    );
    h.dispatcher
        .load_command(CommandConfig::new("whoami").handler(|ctx: Context| async move {
            ctx.get_state::<Caller>().map(|c| c.0)
        }))
        .await
        .unwrap();

    assert!(h.send("!whoami").await.is_completed());
    assert_eq!(h.sent(), ["user"]);
}

#[tokio::test]
async fn test_services_and_redispatch() {
    let h = Harness::new(Dispatcher::new());
    h.dispatcher.services().bind_instance("motd", String::from("be nice")).unwrap();

    h.dispatcher
        .load_command(CommandConfig::new("motd").handler(|ctx: Context| async move {
            ctx.services().get::<String>("motd").await.map(|m| m.to_string())
        }))
        .await
        .unwrap();
    h.dispatcher
        .load_command(CommandConfig::new("again").handler(|ctx: Context| async move {
            let replay = Message::new(
                "2",
                "!motd",
                ctx.author().clone(),
                ctx.message().channel.clone(),
            );
            let outcome = ctx.dispatcher().dispatch(Arc::new(replay)).await;
            outcome.is_completed().then_some("replayed")
        }))
        .await
        .unwrap();

    assert!(h.send("!again").await.is_completed());
    assert_eq!(h.sent(), ["be nice", "replayed"]);
}

#[tokio::test]
async fn test_mention_prefix_and_echo_suppression() {
    let dispatcher = Dispatcher::builder().prefix(parley_framework::Prefix::Mention).build();
    let h = Harness::new(dispatcher);
    h.dispatcher
        .load_command(CommandConfig::new("ping").handler(|_ctx: Context| async { "pong" }))
        .await
        .unwrap();

    // Before the identity is known a mention prefix cannot match.
    assert_eq!(
        h.send("<@99> ping").await.failure_kind(),
        Some(FailureKind::PrefixFiltered)
    );

    h.dispatcher.set_client(ClientInfo::new("99", "parley"));
    assert!(h.send("<@99> ping").await.is_completed());

    let own = Arc::new(Message::new(
        "3",
        "<@99> ping",
        Author::new("99", "parley").bot(),
        h.channel.clone(),
    ));
    assert_eq!(
        h.dispatcher.dispatch(own).await.failure_kind(),
        Some(FailureKind::EventFiltered)
    );
    assert_eq!(h.sent(), ["pong"]);
}

#[tokio::test]
async fn test_unload_emits_event_and_stops_routing() {
    let h = Harness::new(Dispatcher::new());
    let unloaded = Arc::new(Mutex::new(Vec::new()));
    {
        let unloaded = unloaded.clone();
        h.dispatcher.events().on(EventPayload::COMMAND_UNLOAD, move |payload| {
            let unloaded = unloaded.clone();
            async move {
                if let EventPayload::CommandUnloaded(name) = payload {
                    unloaded.lock().push(name);
                }
            }
        });
    }
    h.dispatcher
        .load_command(
            CommandConfig::with_triggers(["roll", "r"]).handler(|_ctx: Context| async { "4" }),
        )
        .await
        .unwrap();

    assert!(h.send("!r").await.is_completed());
    h.dispatcher.unload_command("r").await.unwrap();

    assert_eq!(*unloaded.lock(), ["roll"]);
    assert_eq!(
        h.send("!roll").await.failure_kind(),
        Some(FailureKind::UnknownCommand)
    );
}
