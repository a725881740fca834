use std::sync::Arc;

use insight_chat_api::{HttpChatApi, SegmentId, UserId};
use insight_panel::chat::{ChatPanel, InitiateOutcome, Message, PanelContext, Sender};
use insight_panel::layout::{PanelWidth, PanelWidthPreference, ResizeController};
use insight_panel::settings::{JsonFileStore, KeyValueStore, PanelSettings};
use insight_panel::{ActionRejection, ConversationPhase};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: insight-chat <segment-id> <user-id> [report-title] [section]";
const DEFAULT_LOG_LEVEL: &str = "warn";
/// Viewport the terminal driver pretends to render into.
const HOST_VIEWPORT_WIDTH: u32 = 1440;

/// Terminal driver for the report chat panel.
///
/// Opens the panel for one segment, then reads stdin:
/// `/start` begins a conversation, `/width [px|reset]` inspects or drags the panel width,
/// `/quit` exits, anything else is sent.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(segment_id), Some(user_id)) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let report_title = args.next().unwrap_or_else(|| "Market research report".to_string());
    let section = args.next();

    let (segment_id, user_id) = match (SegmentId::parse(&segment_id), UserId::parse(&user_id)) {
        (Ok(segment_id), Ok(user_id)) => (segment_id, user_id),
        (Err(error), _) | (_, Err(error)) => {
            eprintln!("{error}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let settings = PanelSettings::load();
    let api = match HttpChatApi::new(settings.to_api_config()) {
        Ok(api) => api,
        Err(error) => {
            tracing::error!("failed to initialize chat service client: {error}");
            std::process::exit(1);
        }
    };

    let preferences = JsonFileStore::open(settings.preferences_path());
    tracing::debug!(path = ?preferences.path(), "preference store ready");
    let mut resize =
        ResizeController::mount(PanelWidthPreference::new(preferences), HOST_VIEWPORT_WIDTH);

    let mut context = PanelContext::new(user_id, segment_id, report_title);
    if let Some(section) = section {
        context = context.with_active_section(section);
    }

    let mut panel =
        ChatPanel::new(Arc::new(api), context).with_request_timeout(settings.request_timeout());

    println!("Loading conversation...");
    let phase = panel.open().await;
    let mut printed = print_new_messages(panel.messages(), 0);
    print_phase_hint(phase);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!("failed to read stdin: {error}");
                break;
            }
        };

        match line.trim() {
            "/quit" => break,
            command if command.starts_with("/width") => {
                handle_width_command(&mut resize, command.trim_start_matches("/width").trim());
            }
            "/start" => match panel.initiate().await {
                Ok(InitiateOutcome::Initiated(session_id)) => {
                    tracing::info!(session_id = %session_id, "conversation started");
                    printed = print_new_messages(panel.messages(), 0);
                }
                Ok(InitiateOutcome::Failed) => {
                    println!("Could not start a conversation. Try /start again.");
                }
                Err(rejection) => print_rejection(&rejection),
            },
            _ => {
                panel.set_draft(line.as_str());
                match panel.submit_draft().await {
                    Ok(_) => {
                        printed = print_new_messages(panel.messages(), printed);
                    }
                    Err(rejection) => print_rejection(&rejection),
                }
            }
        }
    }
}

fn handle_width_command<S: KeyValueStore>(resize: &mut ResizeController<S>, argument: &str) {
    match argument {
        "" => {}
        "reset" => {
            if let Err(error) = resize.reset_width() {
                tracing::warn!("failed to clear panel width: {error}");
            }
        }
        value => {
            let Ok(width) = value.parse::<u32>() else {
                println!("usage: /width [pixels|reset]");
                return;
            };
            let Some(mut drag) = resize.begin_drag() else {
                println!("Resizing is disabled at this viewport width.");
                return;
            };
            let pointer_x = resize_pointer_for(width);
            if !drag.pointer_moved(pointer_x) {
                println!("{width}px is outside the allowed range.");
            }
            if let Err(error) = drag.finish() {
                tracing::warn!("failed to persist panel width: {error}");
            }
        }
    }

    match resize.effective_width() {
        PanelWidth::FullViewport => println!("panel width: full viewport"),
        PanelWidth::Default => println!("panel width: default"),
        PanelWidth::Pixels(pixels) => println!("panel width: {pixels}px"),
    }
}

/// Pointer position on the leading edge that yields `width` for a right-docked panel.
fn resize_pointer_for(width: u32) -> f32 {
    HOST_VIEWPORT_WIDTH as f32 - width as f32
}

fn print_new_messages(messages: &[Message], already_printed: usize) -> usize {
    for message in messages.iter().skip(already_printed) {
        let label = match message.sender {
            Sender::User => "you",
            Sender::System => "assistant",
        };
        println!("[{}] {label}: {}", message.timestamp.format("%H:%M"), message.content);
    }
    messages.len()
}

fn print_phase_hint(phase: ConversationPhase) {
    match phase {
        ConversationPhase::Uninitiated => println!("No conversation yet. Type /start to begin."),
        ConversationPhase::Initiated | ConversationPhase::Active => {
            println!("Type a question, or /quit to leave.")
        }
    }
}

fn print_rejection(rejection: &ActionRejection) {
    match rejection {
        ActionRejection::StillLoading => println!("Still loading, please wait."),
        ActionRejection::WrongPhase {
            phase: ConversationPhase::Uninitiated,
            ..
        } => println!("Type /start to begin a conversation first."),
        ActionRejection::WrongPhase { .. } => println!("A conversation is already running."),
        ActionRejection::SendInFlight => println!("Waiting for the previous reply."),
        ActionRejection::EmptyContent => {}
        ActionRejection::MissingSession | ActionRejection::Regression(_) => {
            tracing::warn!(?rejection, "unexpected panel rejection");
        }
    }
}
