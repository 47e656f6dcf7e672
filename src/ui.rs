//! Capabilities the game controllers drive. A front end implements these
//! once per target toolkit; the controllers never touch a rendering surface
//! directly.

use crate::game_over::GameSummary;
use crate::session::Event;
use std::fmt;

/// Keys the guess input reacts to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Tab,
    Other,
}

/// Where focus went when the guess input lost it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FocusTarget {
    SubmitControl,
    Elsewhere,
}

/// Element a detail popover is attached to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Anchor {
    HintAffordance,
}

/// The game page: guess list, guess input, suggestion list, hint widgets and
/// the end-of-game summary.
pub trait GameView {
    fn append_guess(&mut self, markup: &str);
    fn set_input_value(&mut self, value: &str);
    fn render_suggestions(&mut self, labels: &[String]);
    fn clear_suggestions(&mut self);
    fn highlight_suggestion(&mut self, index: Option<usize>);
    fn scroll_suggestion_into_view(&mut self, index: usize);
    fn show_hint_affordance(&mut self);
    fn set_hint_bouncing(&mut self, bouncing: bool);
    fn show_hint_panel(&mut self, title: &str, message: &str);
    fn show_summary(&mut self, summary: &GameSummary);
    fn close_summary(&mut self);
    /// Disables the guess input and submit control for good.
    fn disable_controls(&mut self, placeholder: &str);
}

pub trait Notifier {
    /// Non-blocking message that goes away on its own.
    fn notify_transient(&mut self, text: &str);
    /// Modal message. When it is dismissed the adapter posts `on_dismiss`
    /// back into the session's event queue.
    fn notify_blocking(&mut self, title: &str, text: &str, on_dismiss: Event);
    fn show_detail(&mut self, anchor: Anchor, title: &str, message: &str);
    fn hide_detail(&mut self, anchor: Anchor);
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug)]
pub enum ClipboardError {
    Io(std::io::Error),
    Unavailable,
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::Io(err) => write!(f, "clipboard io error: {err}"),
            ClipboardError::Unavailable => write!(f, "clipboard unavailable"),
        }
    }
}

impl std::error::Error for ClipboardError {}

impl From<std::io::Error> for ClipboardError {
    fn from(value: std::io::Error) -> Self {
        ClipboardError::Io(value)
    }
}
