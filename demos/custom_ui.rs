//! Line-mode chat client: a minimal [`ChatUi`] driven by [`SessionController::run`].
//!
//! Every stdin line is sent as a chat message; `/quit` (or end of input)
//! leaves the room.
//!
//! ```sh
//! cargo run --example custom_ui -- http://localhost:3000 lobby Alice
//! RUST_LOG=chatroom_client=debug cargo run --example custom_ui
//! ```

use chatroom_client::{
    ChatConfig, ChatMessage, ChatUi, SessionController, UserInput, WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Prints every UI update as one line on stdout.
struct PrintUi;

impl ChatUi for PrintUi {
    fn render_message(&mut self, message: &ChatMessage) {
        let marker = if message.is_mine() { "*" } else { " " };
        println!("{marker}[{}] {}: {}", message.timestamp, message.from, message.text);
    }

    fn set_status_text(&mut self, text: &str) {
        println!("-- {text}");
    }

    fn set_typing_indicator(&mut self, text: Option<&str>) {
        if let Some(text) = text {
            println!("   ({text})");
        }
    }

    fn set_connect_button_label(&mut self, _label: &str) {}

    fn alert(&mut self, message: &str) {
        eprintln!("!! {message}");
    }

    fn clear_compose_field(&mut self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "http://localhost:3000".to_owned());
    let room = args.next().unwrap_or_default();
    let name = args.next().unwrap_or_default();

    let config = ChatConfig::new(url);
    let connector = WebSocketConnector::new(config.connect_timeout);
    let mut controller = SessionController::new(connector, PrintUi, config);

    let (inputs, input_rx) = mpsc::channel(64);
    inputs.send(UserInput::Connect { room, name }).await?;

    // Stdin is read on its own task; dropping `inputs` ends the session loop.
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim() == "/quit" {
                break;
            }
            if inputs.send(UserInput::InputChanged).await.is_err()
                || inputs.send(UserInput::SubmitMessage(line)).await.is_err()
            {
                break;
            }
        }
    });

    controller.run(input_rx).await;
    Ok(())
}
