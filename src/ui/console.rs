//! Line-oriented terminal console
//!
//! Reads user commands from stdin and prints the activity feed and the
//! recording panel as they change.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;

use super::{DisplayState, LogEntry};
use crate::api::GestureAction;
use crate::sync::Command;

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Send(Command),
    ShowStatus,
    ShowGestures,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return ConsoleInput::Empty;
    };
    let rest: Vec<&str> = words.collect();

    match verb.to_ascii_lowercase().as_str() {
        "start" => ConsoleInput::Send(Command::StartEngine),
        "stop" => ConsoleInput::Send(Command::StopEngine),
        "retrain" => ConsoleInput::Send(Command::Retrain),
        "record" => ConsoleInput::Send(Command::Record),
        "cancel" => ConsoleInput::Send(Command::LeaveRecording),
        "reload" => ConsoleInput::Send(Command::LoadGestures),
        "list" | "ls" => ConsoleInput::ShowGestures,
        "status" => ConsoleInput::ShowStatus,
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        "add" | "save" => {
            // A missing name still goes through so the coordinator reports it
            let name = rest.first().copied().unwrap_or_default().to_string();
            let action = rest.get(1).copied().unwrap_or_default().to_string();
            let description = rest.get(2..).map(|d| d.join(" ")).unwrap_or_default();
            if verb.eq_ignore_ascii_case("save") {
                ConsoleInput::Send(Command::SaveRecorded {
                    name,
                    action,
                    description,
                })
            } else {
                ConsoleInput::Send(Command::AddGesture {
                    name,
                    action,
                    description,
                })
            }
        }
        "delete" | "rm" => match rest.first().map(|id| id.parse::<i64>()) {
            Some(Ok(id)) => ConsoleInput::Send(Command::DeleteGesture(id)),
            _ => ConsoleInput::Invalid("usage: delete <id>".to_string()),
        },
        other => ConsoleInput::Invalid(format!("unknown command '{}', try 'help'", other)),
    }
}

pub fn help_text() -> String {
    let actions: Vec<&str> = GestureAction::ALL.iter().map(|a| a.as_str()).collect();
    format!(
        "COMMANDS:
    start | stop | retrain           Control the recognition engine
    list | reload                    Show / refresh the gesture registry
    add <name> <action> [desc...]    Register a gesture
    save <name> <action> [desc...]   Register the last recorded finger count
    delete <id>                      Remove a gesture
    record | cancel                  Record a new sample / leave recording
    status                           Show engine and recording state
    quit                             Exit

ACTIONS:
    {}
",
        actions.join(", ")
    )
}

/// Print feed entries and recording panel changes until the channels close
pub fn spawn_printers(
    mut feed_rx: broadcast::Receiver<LogEntry>,
    mut view_rx: watch::Receiver<DisplayState>,
) {
    tokio::spawn(async move {
        loop {
            match feed_rx.recv().await {
                Ok(entry) => println!("{}", entry),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("Console skipped {} feed entries", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        let (mut shown, mut shown_added) = {
            let view = view_rx.borrow();
            (view.recording.clone(), view.last_added_id)
        };
        while view_rx.changed().await.is_ok() {
            let (recording, added) = {
                let view = view_rx.borrow_and_update();
                (view.recording.clone(), view.last_added_id)
            };
            if added != shown_added {
                if let Some(id) = added {
                    println!("  Saved as #{} (delete {} to remove)", id, id);
                }
                shown_added = added;
            }
            if recording == shown {
                continue;
            }
            if recording.is_visible() && recording.countdown != shown.countdown {
                println!("  ⏱  {}", recording.countdown);
            }
            if let Some(ref result) = recording.result {
                if shown.result.as_ref() != Some(result) {
                    println!("  {}", result.text);
                }
            }
            shown = recording;
        }
    });
}

/// Read stdin until `quit` or EOF, forwarding commands to the coordinator
pub async fn run_console(
    cmd_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<DisplayState>,
) -> Result<()> {
    println!("{}", help_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ConsoleInput::Send(command) => {
                let refresh = matches!(command, Command::LoadGestures);
                if cmd_tx.send(command).await.is_err() {
                    break;
                }
                if refresh {
                    println!("Reloading gestures...");
                }
            }
            ConsoleInput::ShowStatus => print!("{}", view_rx.borrow().render()),
            ConsoleInput::ShowGestures => {
                let view = view_rx.borrow();
                println!("Gestures ({}):", view.total_gestures);
                print!("{}", view.render_gestures());
            }
            ConsoleInput::Help => println!("{}", help_text()),
            ConsoleInput::Quit => break,
            ConsoleInput::Empty => {}
            ConsoleInput::Invalid(message) => println!("{}", message),
        }
    }

    Ok(())
}
