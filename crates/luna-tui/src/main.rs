use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use luna_core::{
    AzureOpenAIClient, ChatSession, Config, DispatchEvent, RequestState, Settings, Submission,
};
use tokio::sync::mpsc;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "luna")]
#[command(about = "Chat with Luna, a travel assistant grounded in your own search index")]
struct Cli {
    /// Path to the config file (defaults to <config dir>/luna/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chat deployment to use, overriding CHAT_MODEL
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Show where configuration is read from and what is set
    Config {
        /// Write an empty config file to fill in, if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Chat) => {
            init_logging(cli.verbose, LogTarget::File)?;
            let settings = load_settings(cli.config.as_ref(), cli.model.as_deref())?;
            run_chat(settings).await
        }
        Some(Commands::Ask { ref question }) => {
            init_logging(cli.verbose, LogTarget::Stderr)?;
            let settings = load_settings(cli.config.as_ref(), cli.model.as_deref())?;
            ask_once(settings, question).await
        }
        Some(Commands::Config { init }) => show_config(cli.config.as_ref(), init),
    }
}

enum LogTarget {
    /// The TUI owns the terminal, so logs go to a file
    File,
    Stderr,
}

fn init_logging(verbose: bool, target: LogTarget) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("luna_core={},luna_tui={}", log_level, log_level))
    });

    match target {
        LogTarget::File => {
            let log_dir = dirs::cache_dir()
                .ok_or_else(|| anyhow!("Could not determine cache directory"))?
                .join("luna");
            std::fs::create_dir_all(&log_dir)?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_dir.join("luna.log"))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn config_path(custom: Option<&PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::get_config_path()?),
    }
}

/// Config file, then environment, then CLI flags. Any missing credential
/// stops the process here, before the terminal is touched.
fn load_settings(custom: Option<&PathBuf>, model: Option<&str>) -> Result<Settings> {
    let path = config_path(custom)?;
    let mut config = Config::load_from(&path)?.merge_env(|name| std::env::var(name).ok());
    if let Some(model) = model {
        config.chat_model = Some(model.to_string());
    }

    let settings = config.resolve().context("Configuration error")?;
    tracing::info!(
        config = %path.display(),
        model = %settings.chat_model,
        index = %settings.retrieval.index_name(),
        "configuration loaded"
    );
    Ok(settings)
}

fn build_session(
    settings: &Settings,
) -> Result<(ChatSession, mpsc::UnboundedReceiver<DispatchEvent>)> {
    let client = AzureOpenAIClient::new(&settings.client)
        .context("Failed to initialize Azure OpenAI client")?;
    Ok(ChatSession::from_settings(Arc::new(client), settings))
}

async fn run_chat(settings: Settings) -> Result<()> {
    let (session, replies) = build_session(&settings)?;
    let mut app = App::new(session);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(replies);

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if app.session.is_pending() {
        tracing::info!("exiting with a request in flight, result discarded");
    }
    result
}

async fn run_app(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

async fn ask_once(settings: Settings, question: &str) -> Result<()> {
    let (mut session, mut replies) = build_session(&settings)?;

    match session.submit(question) {
        Submission::Ignored => bail!("Question is empty"),
        Submission::Quit => return Ok(()),
        Submission::Dispatched { .. } => {}
    }

    let event = replies
        .recv()
        .await
        .ok_or_else(|| anyhow!("Request was dropped before it finished"))?;
    let outcome = session.apply(event);

    let last = session
        .transcript()
        .entries()
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    match outcome {
        RequestState::Failed => bail!(last),
        _ => {
            println!("{}", last);
            Ok(())
        }
    }
}

fn show_config(custom: Option<&PathBuf>, init: bool) -> Result<()> {
    let path = config_path(custom)?;
    if init {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        let template = Config {
            api_version: Some(luna_core::config::DEFAULT_API_VERSION.to_string()),
            query_type: Some("vector".to_string()),
            ..Config::default()
        };
        template.save_to(&path)?;
        println!("Wrote {}", path.display());
    }
    let file = Config::load_from(&path)?;
    let merged = file.clone().merge_env(|name| std::env::var(name).ok());

    println!("Config file: {}{}", path.display(), if path.exists() { "" } else { " (not found)" });
    println!();
    for ((name, value), (_, from_file)) in merged.describe().into_iter().zip(file.describe()) {
        let source = if value == "(unset)" {
            ""
        } else if std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            " [env]"
        } else if from_file != "(unset)" {
            " [file]"
        } else {
            ""
        };
        println!("  {:<20} {}{}", name, value, source);
    }

    match merged.resolve() {
        Ok(_) => println!("\nConfiguration is complete."),
        Err(e) => println!("\n{}", e),
    }
    Ok(())
}
