//! Magpie CLI
//!
//! Interactive REPL (default) or single-prompt mode. Ctrl+C during a turn
//! cancels the turn and returns to the prompt; EOF or /quit exits with
//! status 0. Non-zero exit is reserved for startup/configuration failure.

use anyhow::Result;
use clap::{Parser, Subcommand};
use magpie::{
    tools, Agent, AgentEvent, Config, Conversation, ProviderClient, TurnCompleteReason,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Cancellation token of the turn currently in flight, if any.
/// SIGINT/SIGTERM cancel it instead of killing the process.
static ACTIVE_TURN: OnceLock<Mutex<Option<CancellationToken>>> = OnceLock::new();

fn active_turn() -> &'static Mutex<Option<CancellationToken>> {
    ACTIVE_TURN.get_or_init(|| Mutex::new(None))
}

fn begin_turn() -> CancellationToken {
    let token = CancellationToken::new();
    if let Ok(mut slot) = active_turn().lock() {
        *slot = Some(token.clone());
    }
    token
}

fn end_turn() {
    if let Ok(mut slot) = active_turn().lock() {
        *slot = None;
    }
}

fn cancel_active_turn() {
    if let Ok(slot) = active_turn().lock() {
        if let Some(ref token) = *slot {
            token.cancel();
        }
    }
}

/// Get the default data directory (REPL history lives here)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("magpie"))
        .unwrap_or_else(|| PathBuf::from(".magpie"))
}

#[derive(Parser)]
#[command(name = "magpie")]
#[command(about = "Magpie - A turn-based LLM agent with tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Working directory for the agent
    #[arg(short = 'd', long, default_value = ".")]
    working_dir: PathBuf,

    /// LLM model to use (overrides MODEL_NAME)
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL for the API endpoint (overrides BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// API key (overrides API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Print every tool call and result
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive REPL session
    Repl,

    /// Run a single prompt
    Prompt {
        /// The prompt to send to the agent
        message: String,
    },
}

fn build_config(cli: &Cli, working_dir: PathBuf) -> Result<Config> {
    let mut config =
        Config::from_env(working_dir, cli.api_key.as_deref())?.with_verbose(cli.verbose);

    if let Some(ref model) = cli.model {
        config = config.with_model(model);
    }
    if let Some(ref base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }

    Ok(config)
}

struct MagpieCli {
    agent: Agent,
    conversation: Conversation,
    model_name: String,
    verbose: bool,
    data_dir: PathBuf,
}

impl MagpieCli {
    fn new(config: Config) -> Result<Self> {
        let model_name = config.provider.model.clone();
        let verbose = config.verbose;
        let working_dir = config.working_dir.clone();

        let registry = tools::create_registry(working_dir.clone())?;
        tracing::debug!(tools = ?registry.names(), "registered tools");

        let provider = Arc::new(ProviderClient::new(config.provider));
        let agent = Agent::new(provider, registry, working_dir);

        Ok(Self {
            agent,
            conversation: Conversation::new(),
            model_name,
            verbose,
            data_dir: default_data_dir(),
        })
    }

    /// Run one turn: append the user message, drive the loop, print events.
    /// A model error is reported as a single line; the session stays up.
    async fn run_turn(&mut self, user_input: &str) -> Result<()> {
        self.conversation.push_user(user_input)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancellation = begin_turn();

        let verbose = self.verbose;
        let model_name = self.model_name.clone();
        let event_fut = async move {
            while let Some(event) = rx.recv().await {
                match event {
                    AgentEvent::TextComplete { text } => {
                        println!("\x1b[93m{}\x1b[0m: {}", model_name, text);
                        std::io::stdout().flush().ok();
                    }
                    AgentEvent::ToolCallStart { tool, arguments, .. } if verbose => {
                        let args_preview = arguments.to_string();
                        let args_short = if args_preview.len() > 80 {
                            format!("{}...", &args_preview[..80])
                        } else {
                            args_preview
                        };
                        println!("\x1b[33m▶ {}: {}\x1b[0m", tool, args_short);
                    }
                    AgentEvent::ToolCallEnd {
                        tool,
                        output,
                        is_error,
                        duration_ms,
                        ..
                    } if verbose => {
                        let preview = if output.len() > 200 {
                            format!("{}...", &output[..200])
                        } else {
                            output
                        };
                        if is_error {
                            println!("\x1b[31m✗ {} ({}ms): {}\x1b[0m", tool, duration_ms, preview);
                        } else {
                            println!("\x1b[32m✓ {} ({}ms): {}\x1b[0m", tool, duration_ms, preview);
                        }
                    }
                    AgentEvent::Usage {
                        input_tokens,
                        output_tokens,
                    } if verbose => {
                        println!("\x1b[90m[{} in, {} out]\x1b[0m", input_tokens, output_tokens);
                    }
                    _ => {}
                }
            }
        };

        // The sender is dropped as soon as the agent finishes so the
        // printer's channel closes and both futures complete.
        let (result, _) = tokio::join!(
            async {
                let r = self
                    .agent
                    .execute_turn(&mut self.conversation, &tx, cancellation)
                    .await;
                drop(tx);
                r
            },
            event_fut
        );

        end_turn();

        match result {
            Ok(turn) => match turn.reason {
                TurnCompleteReason::TextResponse => {}
                TurnCompleteReason::Cancelled => {
                    println!("\x1b[33m⚠ Cancelled\x1b[0m");
                }
                TurnCompleteReason::MaxIterations => {
                    println!("\x1b[33m⚠ Max iterations reached\x1b[0m");
                }
            },
            Err(e) => {
                eprintln!("\x1b[31mError: {}\x1b[0m", e);
            }
        }

        Ok(())
    }

    async fn run_repl(&mut self) -> Result<()> {
        let session_id = uuid::Uuid::new_v4();

        println!("Magpie REPL");
        println!("Working directory: {}", self.agent.working_dir().display());
        println!("Model: {}", self.model_name);
        println!("Session: {}", session_id);
        println!();
        println!("Commands: /quit, /clear, /help");
        println!();

        tracing::info!(session = %session_id, "starting chat session");

        let mut rl = DefaultEditor::new()?;
        std::fs::create_dir_all(&self.data_dir).ok();
        let history_path = self.data_dir.join("history.txt");
        let _ = rl.load_history(&history_path);

        loop {
            let prompt = if self.conversation.is_empty() {
                "magpie> "
            } else {
                "magpie>> "
            };

            match rl.readline(prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line)?;

                    match line {
                        "/quit" | "/exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        "/clear" => {
                            self.conversation.clear();
                            println!("History cleared.");
                            continue;
                        }
                        "/help" => {
                            println!("Commands:");
                            println!("  /quit, /exit  - Exit");
                            println!("  /clear        - Clear chat history");
                            println!("  /help         - Show this");
                            continue;
                        }
                        _ if line.starts_with('/') => {
                            println!("Unknown command: {}", line);
                            continue;
                        }
                        _ => {}
                    }

                    self.run_turn(line).await?;
                    println!();
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C with no active turn - just show the prompt again
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(e) => {
                    eprintln!("Error: {:?}", e);
                    break;
                }
            }
        }

        let _ = rl.save_history(&history_path);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "magpie=debug" } else { "magpie=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // SIGINT/SIGTERM cancel the in-flight turn; the loop synthesizes results
    // for outstanding tool calls and control returns to the prompt.
    tokio::spawn(async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };

        loop {
            tokio::select! {
                _ = sigint.recv() => cancel_active_turn(),
                _ = sigterm.recv() => cancel_active_turn(),
            }
        }
    });

    // Startup/configuration failures exit non-zero from here on
    let working_dir = if cli.working_dir.is_absolute() {
        cli.working_dir.clone()
    } else {
        std::env::current_dir()?.join(&cli.working_dir)
    }
    .canonicalize()?;

    let config = build_config(&cli, working_dir)?;
    let mut magpie = MagpieCli::new(config)?;

    match cli.command {
        Some(Commands::Prompt { message }) => {
            magpie.run_turn(&message).await?;
        }
        Some(Commands::Repl) | None => {
            magpie.run_repl().await?;
        }
    }

    Ok(())
}
