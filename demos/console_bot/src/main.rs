//! Console Bot
//!
//! A Parley bot whose host platform is the terminal. Every line read from
//! stdin becomes a message from `you`; the bot's replies are printed to
//! stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot -- --prefix '!' --prefix '@mention'
//! ```
//!
//! Then type `!help`, `!roll 20`, `!pick tea coffee "hot chocolate"` or
//! `<@console> ping`. End input (Ctrl+D) or press Ctrl+C to stop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use parley::framework::HandlerError;
use parley::prelude::*;
use parley::runtime::EventSender;

const BOT_ID: &str = "console";

/// Chat with a Parley bot in the terminal.
#[derive(Parser)]
#[command(name = "console-bot", about = "Chat with a Parley bot in the terminal", version)]
struct Cli {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command prefix; repeat for several. `@mention` matches `<@console>`.
    #[arg(short, long)]
    prefix: Vec<String>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Host
// ============================================================================

struct ConsoleChannel;

#[async_trait]
impl Channel for ConsoleChannel {
    fn id(&self) -> &str {
        "console"
    }

    async fn send(&self, text: &str) -> EmitResult<()> {
        println!("bot> {text}");
        Ok(())
    }

    async fn send_embed(&self, embed: &Embed) -> EmitResult<()> {
        for line in embed.to_plain_text().lines() {
            println!("bot> {line}");
        }
        Ok(())
    }
}

/// Feeds stdin lines into the runtime until EOF.
async fn read_stdin(events: EventSender) {
    if events
        .send(HostEvent::Ready(ClientInfo::new(BOT_ID, "Parley")))
        .is_err()
    {
        return;
    }

    let channel: Arc<dyn Channel> = Arc::new(ConsoleChannel);
    let you = Author::new("you", "you");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id: u64 = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                next_id += 1;
                let message = Message::new(next_id.to_string(), line, you.clone(), channel.clone());
                if events.send(HostEvent::MessageCreate(Arc::new(message))).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}

// ============================================================================
// Services
// ============================================================================

/// One RNG shared by every `roll`.
struct Dice {
    rng: Mutex<StdRng>,
}

impl Dice {
    fn roll(&self, sides: i64) -> i64 {
        self.rng.lock().gen_range(1..=sides)
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn roll(ctx: Context) -> Result<String, BoxError> {
    let sides = ctx.args().int("sides").unwrap_or(6);
    if sides < 1 {
        return Err(HandlerError::new("a die needs at least one side").into());
    }
    let dice = ctx.services().get::<Dice>("dice").await?;
    Ok(format!(
        "{} rolled {} on a d{sides}",
        ctx.author().name,
        dice.roll(sides)
    ))
}

async fn pick(ctx: Context) -> Response {
    let choices: Vec<Response> = ctx
        .args()
        .strings("choices")
        .into_iter()
        .map(Response::text)
        .collect();
    if choices.is_empty() {
        Response::text("Give me something to pick from.")
    } else {
        Response::Choice(choices)
    }
}

async fn help(ctx: Context) -> Embed {
    ctx.commands()
        .commands()
        .iter()
        .fold(Embed::new().title("Commands"), |embed, command| {
            embed.field(
                command.usage(),
                command.description().unwrap_or("no description"),
                false,
            )
        })
}

fn commands() -> Vec<CommandConfig> {
    vec![
        CommandConfig::new("ping")
            .description("Check that the bot is listening")
            .handler(|_ctx: Context| async { "pong" }),
        CommandConfig::new("echo")
            .alias("say")
            .parameter("text+ : what to repeat")
            .description("Repeat text back")
            .handler(|ctx: Context| async move {
                ctx.args().str("text").unwrap_or_default().to_string()
            }),
        CommandConfig::new("roll")
            .parameter("-sides(int) = 6 : faces on the die")
            .description("Roll a die")
            .handler(roll),
        CommandConfig::new("pick")
            .alias("choose")
            .parameter("choices* : things to choose between")
            .description("Pick one of several options")
            .handler(pick),
        CommandConfig::new("help")
            .description("List every command")
            .handler(help),
    ]
}

/// Logs each command with its duration.
fn log_commands() -> DispatchLayer {
    from_fn(|ctx: Context, next: Next<Context, Response>| async move {
        let command = ctx.command().name().to_string();
        let started = Instant::now();
        let result = next.run(ctx).await;
        info!(
            command = %command,
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Command finished"
        );
        result
    })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is the chat.
    let mut builder = ParleyRuntime::builder()
        .set("logging.output", "stderr")
        .layer(log_commands());
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if !cli.prefix.is_empty() {
        builder = builder.set("prefix", &cli.prefix);
    }
    if cli.verbose {
        builder = builder.set("logging.level", "debug");
    }
    let runtime = builder.build()?;

    runtime.services().bind_singleton("dice", |_services| async {
        Dice {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    })?;

    runtime
        .events()
        .on(EventPayload::DISPATCH_FAIL, |payload| async move {
            if let EventPayload::DispatchFailed(failure) = payload
                && !failure.kind.is_filter()
            {
                match &failure.error {
                    Some(error) => println!("bot> {error}"),
                    None => println!("bot> {}", failure.kind),
                }
            }
        });

    for command in commands() {
        runtime.load_command(command).await?;
    }

    info!(prefix = ?runtime.config().prefix, "Type a command, or Ctrl+D to quit");
    let events = runtime.sender()?;
    tokio::spawn(read_stdin(events));

    runtime.run().await?;

    let stats = runtime.stats();
    info!(
        completed = stats.completed,
        failed = stats.failed,
        "Goodbye"
    );
    Ok(())
}
