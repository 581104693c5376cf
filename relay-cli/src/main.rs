mod client;

use anyhow::Result;
use client::{BackendClient, ChatReply, ConnectionStatus};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use relay_shared::{ChatMessage, MessageRole};
use std::io;
use tokio::sync::mpsc;
use tracing::info;

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const BACKEND_COMMAND: &str = "/backend ";

struct App {
    /// Conversation plus local notices; notices use the System role and are
    /// never sent to the backend.
    messages: Vec<ChatMessage>,
    input: String,
    scroll: u16,
    connection_status: ConnectionStatus,
    pending: bool,
}

impl App {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            scroll: 0,
            connection_status: ConnectionStatus::Checking,
            pending: false,
        }
    }

    fn add_notice(&mut self, content: String) {
        self.messages.push(ChatMessage {
            role: MessageRole::System,
            content,
        });
    }

    /// Moves the input line into the conversation and returns what should be
    /// sent, or `None` if nothing may be sent right now.
    fn submit(&mut self) -> Option<Vec<ChatMessage>> {
        if self.input.trim().is_empty() || self.pending {
            return None;
        }
        if self.connection_status != ConnectionStatus::Connected {
            self.add_notice(
                "Backend is not connected. Use /backend <url> or press Ctrl-R to retry."
                    .to_string(),
            );
            return None;
        }

        let content = std::mem::take(&mut self.input);
        self.messages.push(ChatMessage {
            role: MessageRole::User,
            content,
        });
        self.pending = true;
        Some(self.conversation())
    }

    fn conversation(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|msg| !matches!(msg.role, MessageRole::System))
            .cloned()
            .collect()
    }

    fn finish(&mut self, reply: ChatReply) {
        self.pending = false;
        match reply {
            ChatReply::Answer(content) => self.messages.push(ChatMessage {
                role: MessageRole::Assistant,
                content,
            }),
            ChatReply::Failed(notice) => self.add_notice(notice),
        }
    }

    /// Clearing mid-request would let the reply land in an empty chat.
    fn clear(&mut self) {
        if self.pending {
            self.add_notice("Wait for the pending reply before clearing.".to_string());
            return;
        }
        self.messages.clear();
        self.scroll = 0;
    }

    /// Takes a `/backend <url>` command out of the input line.
    fn take_backend_command(&mut self) -> Option<String> {
        let url = self.input.trim().strip_prefix(BACKEND_COMMAND)?.trim().to_string();
        if url.is_empty() {
            return None;
        }
        self.input.clear();
        self.connection_status = ConnectionStatus::Checking;
        self.add_notice(format!("Switched backend to {}", url));
        Some(url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to file instead of terminal to avoid corrupting TUI
    let log_file = std::fs::File::create("relay-cli.log").ok();
    if let Some(file) = log_file {
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .init();
    }
    dotenv::dotenv().ok();

    let backend_url =
        std::env::var("RELAY_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
    info!("Using backend at {}", backend_url);
    let client = BackendClient::new(backend_url);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(event) = event::read() {
            if ui_tx.send(event).is_err() {
                break;
            }
        }
    });

    let res = run_app(&mut terminal, &mut app, client, &mut ui_rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Reports the status tagged with the URL it was checked against.
fn spawn_health_check(
    client: &BackendClient,
    status_tx: &mpsc::UnboundedSender<(String, ConnectionStatus)>,
) {
    let client = client.clone();
    let status_tx = status_tx.clone();
    tokio::spawn(async move {
        let status = client.check_health().await;
        let _ = status_tx.send((client.base_url().to_string(), status));
    });
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut client: BackendClient,
    ui_rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

    spawn_health_check(&client, &status_tx);

    loop {
        terminal.draw(|f| ui(f, app, client.base_url()))?;

        tokio::select! {
            Some(event) = ui_rx.recv() => {
                let Event::Key(key) = event else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                match key.code {
                    KeyCode::Char('q') if ctrl => return Ok(()),
                    KeyCode::Char('l') if ctrl => app.clear(),
                    KeyCode::Char('r') if ctrl => {
                        app.connection_status = ConnectionStatus::Checking;
                        spawn_health_check(&client, &status_tx);
                    }
                    KeyCode::Char(c) if !ctrl => {
                        app.input.push(c);
                    }
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Enter => {
                        if let Some(url) = app.take_backend_command() {
                            info!("Switching backend to {}", url);
                            client = BackendClient::new(url);
                            spawn_health_check(&client, &status_tx);
                        } else if let Some(messages) = app.submit() {
                            let client = client.clone();
                            let reply_tx = reply_tx.clone();
                            tokio::spawn(async move {
                                let _ = reply_tx.send(client.send_chat(messages).await);
                            });
                        }
                    }
                    KeyCode::Up => {
                        app.scroll = app.scroll.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        if (app.scroll as usize) + 1 < app.messages.len() {
                            app.scroll += 1;
                        }
                    }
                    _ => {}
                }
            }
            Some((url, status)) = status_rx.recv() => {
                // Results for a backend we already switched away from are stale.
                if url == client.base_url() {
                    app.connection_status = status;
                }
            }
            Some(reply) = reply_rx.recv() => {
                app.finish(reply);
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App, backend_url: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    let (status_color, status_text) = match &app.connection_status {
        ConnectionStatus::Connected => (Color::Green, "● Connected"),
        ConnectionStatus::Checking => (Color::Yellow, "● Checking..."),
        ConnectionStatus::Disconnected => (Color::Red, "● Disconnected"),
    };

    let status = Paragraph::new(format!("{}  {}", status_text, backend_url))
        .style(Style::default().fg(status_color))
        .block(Block::default());
    f.render_widget(status, chunks[0]);

    let mut all_messages = app.messages.clone();
    if app.pending {
        all_messages.push(ChatMessage {
            role: MessageRole::Assistant,
            content: "●●●".to_string(),
        });
    }

    let messages: Vec<ListItem> = all_messages
        .iter()
        .skip(app.scroll as usize)
        .map(|msg| {
            let (prefix, style) = match msg.role {
                MessageRole::System => ("Notice", Style::default().fg(Color::Red)),
                MessageRole::User => ("You", Style::default().fg(Color::Cyan)),
                MessageRole::Assistant => ("Assistant", Style::default().fg(Color::Green)),
            };

            let mut lines = vec![Line::from(Span::styled(
                format!("{}:", prefix),
                style.add_modifier(Modifier::BOLD),
            ))];
            for line in msg.content.lines() {
                lines.push(Line::from(Span::raw(line)));
            }
            lines.push(Line::from(""));

            ListItem::new(lines)
        })
        .collect();

    let messages_list = List::new(messages)
        .block(Block::default().borders(Borders::ALL).title("Chat"))
        .style(Style::default());
    f.render_widget(messages_list, chunks[1]);

    let input = Paragraph::new(app.input.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Input (Ctrl-Q quit, Ctrl-L clear, Ctrl-R reconnect, /backend <url>)"),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[2]);
}
