//! Interactive REPL that shows the prompt a model would receive for each turn.

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use recollect_rs::config::RecollectConfig;
use recollect_rs::memory::MemoryError;
use recollect_rs::{ChatSession, build_memory, init_logging, recall_options};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

/// Command-line options for the REPL.
#[derive(Parser)]
#[command(name = "recollect", version)]
struct Cli {
    /// Optional path to a recollect.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Resume an existing session (requires a persistent backend to be useful)
    #[arg(long)]
    session: Option<Uuid>,
    /// Override the retention window size
    #[arg(long)]
    max_history: Option<usize>,
    /// Override the number of recalled records per turn
    #[arg(long)]
    k: Option<usize>,
    /// Store an echo of each question as the assistant reply
    #[arg(long)]
    echo: bool,
}

/// Commands recognized on their own line.
enum ReplCommand {
    Exit,
    Clear,
    Message(String),
}

fn parse_line(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" => ReplCommand::Exit,
        "clear" => ReplCommand::Clear,
        _ => ReplCommand::Message(line.to_string()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!(
        "starting REPL (config_set={}, session_set={}, echo={})",
        cli.config.is_some(),
        cli.session.is_some(),
        cli.echo
    );
    let mut config = if let Some(path) = cli.config.as_ref() {
        RecollectConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        info!("loading layered config from cwd: {}", cwd.display());
        let layered =
            RecollectConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    if let Some(max_history) = cli.max_history {
        config.memory.max_history = max_history;
    }
    if let Some(k) = cli.k {
        config.memory.recall_k = k;
    }
    config.validate().context("invalid configuration")?;

    let memory = build_memory(&config.memory, cli.session)
        .await
        .context("failed to build memory")?;
    let session_id = memory.session_id();
    let chat = ChatSession::new(
        memory,
        config.memory.recall_k,
        recall_options(&config.memory),
    );

    let mut stdout = tokio::io::stdout();
    let banner = format!("session {session_id} (type 'exit' to quit, 'clear' to forget)\n");
    stdout.write_all(banner.as_bytes()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"User : ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let Some(command) = parse_line(&line) else {
            continue;
        };
        let output = match command {
            ReplCommand::Exit => break,
            ReplCommand::Clear => match chat.clear().await {
                Ok(()) => "history cleared\n".to_string(),
                Err(err) => format!("error: {err}\n"),
            },
            ReplCommand::Message(message) => match run_turn(&chat, &message, cli.echo).await {
                Ok(prompt) => format!("{prompt}\n"),
                Err(MemoryError::InvalidArgument(reason)) => format!("rejected: {reason}\n"),
                Err(err) => format!("error: {err}\n"),
            },
        };
        stdout.write_all(output.as_bytes()).await?;
    }
    info!("REPL finished (session_id={})", session_id);
    Ok(())
}

async fn run_turn(chat: &ChatSession, message: &str, echo: bool) -> Result<String, MemoryError> {
    let turn = chat.prepare_turn(message).await?;
    debug!("prepared turn (recalled={})", turn.context.len());
    if echo {
        chat.record_response(format!("You said: {message}")).await?;
    }
    Ok(turn.prompt)
}
