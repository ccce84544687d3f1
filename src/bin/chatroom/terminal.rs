//! Raw-mode terminal UI and its event loop.
//!
//! One `tokio::select!` loop multiplexes key presses, connection events and
//! the typing idle timer, so every keystroke reaches the session controller
//! as an edit pulse in order with inbound frames.

use std::fmt::Display;
use std::io::{self, Stdout, Write};

use chatroom_client::session::sleep_until_deadline;
use chatroom_client::{ChatMessage, ChatUi, Connector, SessionController, UserInput};
use crossterm::cursor::MoveToColumn;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{PrintStyledContent, Print, Stylize};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crossterm::queue;
use futures_util::StreamExt;

const HELP: &str =
    "commands: /connect [room] [name]  /join [room] [name]  /disconnect  /quit";

// ── UI ──────────────────────────────────────────────────────────────

/// Line-oriented [`ChatUi`] with a one-line prompt at the bottom.
///
/// The prompt shows the connect control label, the typing indicator and the
/// compose buffer. Everything else scrolls above it.
pub struct TerminalUi {
    out: Stdout,
    compose: String,
    /// Room and name "fields" used by `/connect` and `/join` without arguments.
    room: String,
    name: String,
    button_label: String,
    typing: Option<String>,
}

impl TerminalUi {
    pub fn new(room: String, name: String) -> Self {
        Self {
            out: io::stdout(),
            compose: String::new(),
            room,
            name,
            button_label: "Connect".to_owned(),
            typing: None,
        }
    }

    fn compose(&self) -> &str {
        &self.compose
    }

    fn push(&mut self, c: char) {
        self.compose.push(c);
        self.redraw_prompt();
    }

    /// Returns `true` if a character was removed.
    fn pop(&mut self) -> bool {
        let removed = self.compose.pop().is_some();
        if removed {
            self.redraw_prompt();
        }
        removed
    }

    /// Update the room/name fields from command arguments and return them.
    fn fields(&mut self, room: Option<&str>, name: Option<&str>) -> (String, String) {
        if let Some(room) = room {
            self.room = room.to_owned();
        }
        if let Some(name) = name {
            self.name = name.to_owned();
        }
        (self.room.clone(), self.name.clone())
    }

    fn notice(&mut self, text: &str) {
        self.print_line(text.dim());
    }

    fn print_line(&mut self, line: impl Display) {
        let _ = queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line),
            Print("\r\n")
        );
        self.redraw_prompt();
    }

    fn redraw_prompt(&mut self) {
        let _ = queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            PrintStyledContent(format!("[{}] ", self.button_label).dim())
        );
        if let Some(typing) = &self.typing {
            let _ = queue!(self.out, PrintStyledContent(format!("({typing}) ").italic()));
        }
        let _ = queue!(self.out, Print("> "), Print(&self.compose));
        let _ = self.out.flush();
    }
}

impl ChatUi for TerminalUi {
    fn render_message(&mut self, message: &ChatMessage) {
        let time = chrono::DateTime::from_timestamp_millis(message.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_owned());
        let from = if message.is_mine() {
            message.from.as_str().cyan().bold()
        } else {
            message.from.as_str().bold()
        };
        self.print_line(format!("{} {from}: {}", format!("[{time}]").dim(), message.text));
    }

    fn set_status_text(&mut self, text: &str) {
        self.print_line(format!("-- {text} --").dim());
    }

    fn set_typing_indicator(&mut self, text: Option<&str>) {
        self.typing = text.map(str::to_owned);
        self.redraw_prompt();
    }

    fn set_connect_button_label(&mut self, label: &str) {
        self.button_label = label.to_owned();
        self.redraw_prompt();
    }

    fn alert(&mut self, message: &str) {
        self.print_line(format!("!! {message}").red().bold());
    }

    fn clear_compose_field(&mut self) {
        self.compose.clear();
        self.redraw_prompt();
    }
}

// ── Event loop ──────────────────────────────────────────────────────

/// Restores cooked mode on every exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut out = io::stdout();
        let _ = queue!(out, Print("\r\n"));
        let _ = out.flush();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run the terminal UI until the user quits.
pub async fn run<C: Connector>(
    mut controller: SessionController<C, TerminalUi>,
    connect_now: bool,
) -> io::Result<()> {
    let _guard = RawModeGuard::enter()?;
    controller.ui_mut().notice(HELP);

    if connect_now {
        let (room, name) = controller.ui_mut().fields(None, None);
        controller.handle_input(UserInput::Connect { room, name });
    }

    let mut keys = EventStream::new();
    let mut result = Ok(());

    loop {
        let deadline = controller.typing_deadline();
        tokio::select! {
            maybe_event = keys.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if handle_key(&mut controller, key) == Flow::Quit {
                        break;
                    }
                }
                Some(Ok(Event::Resize(..))) => controller.ui_mut().redraw_prompt(),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    result = Err(e);
                    break;
                }
                None => break,
            },
            event = controller.next_connection_event() => controller.handle_connection_event(event),
            () = sleep_until_deadline(deadline) => controller.on_typing_timer(),
        }
    }

    controller.shutdown().await;
    result
}

fn handle_key<C: Connector>(
    controller: &mut SessionController<C, TerminalUi>,
    key: KeyEvent,
) -> Flow {
    match key.code {
        KeyCode::Esc => return Flow::Quit,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Flow::Quit;
        }
        KeyCode::Char(c) => {
            controller.ui_mut().push(c);
            controller.handle_input(UserInput::InputChanged);
        }
        KeyCode::Backspace => {
            if controller.ui_mut().pop() {
                controller.handle_input(UserInput::InputChanged);
            }
        }
        KeyCode::Enter => {
            let line = controller.ui().compose().to_owned();
            if let Some(command) = line.trim_start().strip_prefix('/') {
                controller.ui_mut().clear_compose_field();
                return run_command(controller, command);
            }
            controller.handle_input(UserInput::SubmitMessage(line));
        }
        _ => {}
    }
    Flow::Continue
}

fn run_command<C: Connector>(
    controller: &mut SessionController<C, TerminalUi>,
    command: &str,
) -> Flow {
    let mut parts = command.split_whitespace();
    let verb = parts.next();
    let room = parts.next();
    let name = parts.next();

    match verb {
        Some("connect") => {
            let (room, name) = controller.ui_mut().fields(room, name);
            controller.handle_input(UserInput::ToggleConnection { room, name });
        }
        Some("join") => {
            let (room, name) = controller.ui_mut().fields(room, name);
            controller.handle_input(UserInput::Connect { room, name });
        }
        Some("disconnect") => controller.handle_input(UserInput::Disconnect),
        Some("quit" | "exit") => return Flow::Quit,
        _ => controller.ui_mut().notice(HELP),
    }
    Flow::Continue
}
