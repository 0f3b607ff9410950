//! Console UI: activity feed, display snapshot and the stdin console

mod console;
mod display;
mod feed;

pub use console::{run_console, spawn_printers};
pub use display::{DisplayState, RecordingView};
#[cfg(test)]
pub use display::Tone;
pub use feed::{ActivityFeed, LogEntry, LogKind};
