//! # chatroom
//!
//! Terminal front end for the chat-room client.
//!
//! ```sh
//! chatroom --url http://localhost:3000 --room lobby --name Alice --connect
//!
//! # Verbose logs go to a file so they do not tear the raw-mode screen:
//! RUST_LOG=debug chatroom --log-file chatroom.log
//! ```

mod terminal;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chatroom_client::{ChatConfig, SessionController, WebSocketConnector};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::terminal::TerminalUi;

#[derive(Parser, Debug)]
#[command(name = "chatroom", version, about = "Realtime chat-room client")]
struct Cli {
    /// Server origin; `http(s)` maps to `ws(s)`.
    #[arg(long, env = "CHATROOM_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Room to join (blank uses the default room).
    #[arg(long, env = "CHATROOM_ROOM", default_value = "")]
    room: String,

    /// Display name (blank uses the default name).
    #[arg(long, env = "CHATROOM_NAME", default_value = "")]
    name: String,

    /// Idle time after the last keystroke before typing is reported stopped.
    #[arg(long, value_name = "MS", default_value_t = 900)]
    typing_timeout_ms: u64,

    /// Give up dialing the server after this many seconds.
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Connect immediately instead of waiting for `/connect`.
    #[arg(long)]
    connect: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = ChatConfig::new(cli.url)
        .with_typing_idle_timeout(Duration::from_millis(cli.typing_timeout_ms))
        .with_connect_timeout(Duration::from_secs(cli.connect_timeout_secs));
    tracing::info!(server = %config.server_url, "starting chatroom");

    let connector = WebSocketConnector::new(config.connect_timeout);
    let ui = TerminalUi::new(cli.room, cli.name);
    let controller = SessionController::new(connector, ui, config);

    terminal::run(controller, cli.connect).await?;
    tracing::info!("chatroom exited");
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}
