use crate::agent::Persona;
use crate::chat::{ChatService, HISTORY_LIMIT, PersistOutcome, Reply};
use crate::intent;
use crate::store::{ChatSummary, UserProfile};
use crate::utils::truncate_chars;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

const DEBUG_MAX_CHARS: usize = 200;

const HELP: &str = "Commands:\n  \
                    /new                 save this chat and start a new conversation\n  \
                    /history             list your recent chats\n  \
                    /open <n>            continue chat number n from the last /history\n  \
                    /login <email> [name]\n  \
                    /logout\n  \
                    /crisis              crisis lines and emergency numbers\n  \
                    /about\n  \
                    /help\n  \
                    /quit\n\
                    Start a message with // to send text that begins with /.";

const CRISIS_RESOURCES: &str = "If you're in crisis:\n  \
                                US: call or text 988\n  \
                                International: https://findahelpline.com\n  \
                                Emergency: 911";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    New,
    History,
    Open(usize),
    Login { email: String, name: Option<String> },
    Logout,
    Crisis,
    About,
    Help,
    Quit,
    Invalid(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };
        // `//text` sends `/text` as chat.
        if rest.starts_with('/') {
            return Command::Say(rest.to_string());
        }

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_lowercase();
        let args = parts.next().map(str::trim).unwrap_or_default();

        match name.as_str() {
            "new" => Command::New,
            "history" => Command::History,
            "open" => match args.parse::<usize>() {
                Ok(n) if n > 0 => Command::Open(n),
                _ => Command::Invalid("usage: /open <n>".into()),
            },
            "login" => {
                let mut args = args.splitn(2, char::is_whitespace);
                match args.next().filter(|e| e.contains('@')) {
                    Some(email) => Command::Login {
                        email: email.to_string(),
                        name: args.next().map(str::trim).filter(|n| !n.is_empty()).map(String::from),
                    },
                    None => Command::Invalid("usage: /login <email> [name]".into()),
                }
            }
            "logout" => Command::Logout,
            "crisis" => Command::Crisis,
            "about" => Command::About,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Invalid(format!("unknown command: /{}", other)),
        }
    }
}

fn describe_persist(outcome: &PersistOutcome) -> Option<String> {
    match outcome {
        PersistOutcome::Failed(e) => Some(format!(
            "(warning: chat history could not be saved: {})",
            truncate_chars(e, DEBUG_MAX_CHARS)
        )),
        _ => None,
    }
}

/// Renders a reply the way the chat window shows it.
pub fn render_reply(persona: Persona, reply: &Reply) -> String {
    match reply {
        Reply::Reset => "Conversation cleared. Let's begin again.".to_string(),
        Reply::Answer {
            text,
            structured,
            persisted,
        } => {
            let body = match structured {
                Some(_) => intent::format_response(text),
                None => text.clone(),
            };
            let mut out = format!("{}: {}", persona.display_name(), body);
            if let Some(warning) = describe_persist(persisted) {
                out.push('\n');
                out.push_str(&warning);
            }
            out
        }
        Reply::Failed { message, debug } => format!(
            "{}\n(debug: {})",
            message,
            truncate_chars(debug, DEBUG_MAX_CHARS)
        ),
    }
}

pub fn render_history(chats: &[ChatSummary]) -> String {
    if chats.is_empty() {
        return "No chat history yet".to_string();
    }
    chats
        .iter()
        .enumerate()
        .map(|(i, chat)| {
            let date = chrono::DateTime::from_timestamp_micros(chat.created_at_us)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            format!(
                "{:>2}. {} ({} messages, {})",
                i + 1,
                chat.preview,
                chat.turns.len(),
                date
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Shell {
    service: ChatService,
    persona: Persona,
    listing: Vec<ChatSummary>,
}

impl Shell {
    pub fn new(service: ChatService, persona: Persona) -> Self {
        Self {
            service,
            persona,
            listing: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        self.print(&mut stdout, &format!(
            "{} is here. {}\nType /help for commands.",
            self.persona.display_name(),
            self.persona.greeting()
        ))
        .await?;

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                break;
            };

            match Command::parse(&line) {
                Command::Quit => break,
                command => {
                    let output = self.execute(command).await;
                    if !output.is_empty() {
                        self.print(&mut stdout, &output).await?;
                    }
                }
            }
        }

        if let PersistOutcome::Failed(e) = self.service.new_conversation().await {
            warn!("Open chat was not saved on exit: {}", e);
        }
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Empty | Command::Quit => String::new(),
            Command::Say(text) => {
                let mut output = String::new();
                if let Some(value) = intent::parse_structured_input(&text) {
                    output.push_str("You sent structured data:\n");
                    output.push_str(&serde_json::to_string_pretty(&value).unwrap_or(text.clone()));
                    output.push('\n');
                }
                let reply = self.service.handle_input(&text).await;
                output.push_str(&render_reply(self.persona, &reply));
                output
            }
            Command::New => {
                let outcome = self.service.new_conversation().await;
                describe_persist(&outcome).unwrap_or_else(|| "Started a new conversation.".into())
            }
            Command::History => {
                if self.service.user().is_none() {
                    return "Sign in with /login to keep a chat history.".into();
                }
                match self.service.history(HISTORY_LIMIT).await {
                    Ok(chats) => {
                        self.listing = chats;
                        render_history(&self.listing)
                    }
                    Err(e) => {
                        warn!("Failed to load chat history: {}", e);
                        "Chat history is unavailable right now.".into()
                    }
                }
            }
            Command::Open(n) => match self.listing.get(n - 1) {
                Some(chat) => {
                    self.service.open(chat);
                    let mut out = format!("Continuing: {}", chat.preview);
                    for turn in self.service.session().turns() {
                        out.push_str(&format!("\n[{}] {}", turn.role, turn.content));
                    }
                    out
                }
                None => "No such chat. Run /history first.".into(),
            },
            Command::Login { email, name } => {
                if self.service.user().is_some() {
                    self.service.sign_out().await;
                }
                let profile = UserProfile::from_email(&email, name.as_deref());
                let greeting = format!("Hello, {}! {}", profile.name, self.persona.greeting());
                let outcome = self.service.sign_in(profile).await;
                self.listing.clear();
                match describe_persist(&outcome) {
                    Some(warning) => format!("{}\n{}", greeting, warning),
                    None => greeting,
                }
            }
            Command::Logout => {
                if self.service.user().is_none() {
                    return "Not signed in.".into();
                }
                let outcome = self.service.sign_out().await;
                self.listing.clear();
                describe_persist(&outcome).unwrap_or_else(|| "Signed out.".into())
            }
            Command::Crisis => CRISIS_RESOURCES.to_string(),
            Command::About => self.persona.about().to_string(),
            Command::Help => HELP.to_string(),
            Command::Invalid(msg) => msg,
        }
    }

    async fn print(&self, stdout: &mut tokio::io::Stdout, text: &str) -> Result<()> {
        stdout.write_all(text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }
}
