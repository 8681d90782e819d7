use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use swipechat::services::conversation::ConversationSummary;
use swipechat::{
    ActiveView, ChatError, ErrorCode, ImageUpload, Message, Seed, SeedError, Sender, SessionConfig, SessionEvent,
    SessionHandle, spawn_session,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Seed(#[from] SeedError),
    #[error("{0}")]
    Chat(#[from] ChatError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "swipechat", about = "Swipe through profiles and chat with your matches")]
struct Cli {
    /// JSON seed file with profiles and pre-seeded conversations.
    #[arg(long, env = "SWIPECHAT_SEED")]
    seed: Option<PathBuf>,

    /// Override the counterpart reply delay.
    #[arg(long)]
    reply_delay_ms: Option<u64>,
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Deck,
    Like,
    Pass,
    Photo,
    Chats,
    Open(usize),
    Close,
    Say(String),
    SendImage(PathBuf),
    Show,
    Help,
    Quit,
    Unknown(String),
}

const HELP: &str = "\
commands:
  deck              show the current profile
  like | pass       like or pass on the current profile
  photo             next photo of the current profile
  chats             list conversations
  open <n>          open conversation n from `chats`
  close             close the open conversation
  say <text>        send a message to the open conversation
  send-image <path> send an image to the open conversation
  show              show the open conversation
  help | quit";

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let input = match word {
        "deck" => Input::Deck,
        "like" => Input::Like,
        "pass" | "dislike" => Input::Pass,
        "photo" => Input::Photo,
        "chats" => Input::Chats,
        "open" => match rest.parse::<usize>() {
            Ok(n) if n > 0 => Input::Open(n),
            _ => Input::Unknown(line.to_owned()),
        },
        "close" => Input::Close,
        "say" => Input::Say(rest.to_owned()),
        "send-image" if !rest.is_empty() => Input::SendImage(PathBuf::from(rest)),
        "show" => Input::Show,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_owned()),
    };
    Some(input)
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swipechat=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let seed = match &cli.seed {
        Some(path) => Seed::load(path).await?,
        None => Seed::builtin(),
    };
    let mut config = SessionConfig::from_env();
    if let Some(ms) = cli.reply_delay_ms {
        config = config.with_reply_delay(Duration::from_millis(ms));
    }

    let max_upload_bytes = config.max_upload_bytes;
    let (handle, join) = spawn_session(seed, config);
    let mut events = handle.subscribe();

    println!("{HELP}");
    render_deck(&handle).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(input) = parse_input(&line) else { continue };
                if input == Input::Quit {
                    break;
                }
                match run_input(&handle, input, max_upload_bytes).await {
                    Ok(()) => {}
                    Err(CliError::Chat(e)) => println!("error [{}]: {e}", e.error_code()),
                    Err(e) => return Err(e),
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::MessageAppended { message, .. }) if message.sender == Sender::Counterpart => {
                    println!("{}", format_message(&message));
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await;
    let _ = join.await;
    Ok(())
}

async fn run_input(handle: &SessionHandle, input: Input, max_upload_bytes: usize) -> Result<(), CliError> {
    match input {
        Input::Deck => render_deck(handle).await?,
        Input::Like => {
            let Some(card) = handle.current_candidate().await? else {
                println!("No profiles available");
                return Ok(());
            };
            handle.like_user(card.user.id).await?;
            println!("You matched with {}!", card.user.name);
            render_deck(handle).await?;
        }
        Input::Pass => {
            handle.dislike_user().await?;
            render_deck(handle).await?;
        }
        Input::Photo => {
            if let Some(card) = handle.current_candidate().await? {
                handle.cycle_profile_image(card.user.id).await?;
            }
            render_deck(handle).await?;
        }
        Input::Chats => render_chats(&handle.conversations().await?),
        Input::Open(n) => {
            let rows = handle.conversations().await?;
            let Some(row) = rows.get(n - 1) else {
                println!("no conversation {n}");
                return Ok(());
            };
            handle.select_conversation(row.conversation_id).await?;
            render_active(&handle.active_conversation().await?);
        }
        Input::Close => {
            handle.clear_selection().await?;
            render_active(&ActiveView::Empty);
        }
        Input::Say(text) => {
            let ActiveView::Conversation { conversation_id, .. } = handle.active_conversation().await? else {
                render_active(&ActiveView::Empty);
                return Ok(());
            };
            handle.send_message(conversation_id, text).await?;
        }
        Input::SendImage(path) => {
            let ActiveView::Conversation { conversation_id, .. } = handle.active_conversation().await? else {
                render_active(&ActiveView::Empty);
                return Ok(());
            };
            let upload = ImageUpload::from_path(&path, max_upload_bytes).await?;
            handle.upload_image(conversation_id, upload).await?;
        }
        Input::Show => render_active(&handle.active_conversation().await?),
        Input::Help => println!("{HELP}"),
        Input::Unknown(line) => println!("unknown command: {line} (try `help`)"),
        Input::Quit => {}
    }
    Ok(())
}

// =============================================================================
// RENDERING
// =============================================================================

async fn render_deck(handle: &SessionHandle) -> Result<(), CliError> {
    match handle.current_candidate().await? {
        Some(card) => {
            println!("[{}/{}] {}, {}", card.cursor + 1, card.deck_len, card.user.name, card.user.age);
            if !card.user.bio.is_empty() {
                println!("  {}", card.user.bio);
            }
            if let Some(image) = card.image {
                println!("  photo: {image}");
            }
        }
        None => println!("No profiles available"),
    }
    Ok(())
}

fn render_chats(rows: &[ConversationSummary]) {
    if rows.is_empty() {
        println!("No messages yet");
        return;
    }
    for (i, row) in rows.iter().enumerate() {
        let marker = if row.active { '*' } else { ' ' };
        let name = row.user_name.as_deref().unwrap_or("unknown");
        let time = row.timestamp.as_deref().unwrap_or("");
        println!("{marker}{:>2}. {name}: {}  {time}", i + 1, row.preview);
    }
}

fn render_active(view: &ActiveView) {
    if let ActiveView::Conversation { user, messages, .. } = view {
        let name = user.as_ref().map_or("unknown", |u| u.name.as_str());
        println!("--- {name} ---");
        for message in messages {
            println!("{}", format_message(message));
        }
    }
    if let Some(placeholder) = view.placeholder() {
        println!("{placeholder}");
    }
}

fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::Me => "you",
        Sender::Counterpart => "them",
        Sender::System => "system",
    };
    let body = match (&message.text, &message.image) {
        (Some(text), _) => text.clone(),
        (None, Some(_)) => "[image]".to_owned(),
        (None, None) => String::new(),
    };
    format!("  {} {who}: {body}", message.timestamp)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
