//! Recording fakes for the UI capabilities and scripted endpoints.

use crate::autocomplete::SuggestionQuery;
use crate::game_over::GameSummary;
use crate::session::Event;
use crate::submission::{GuessForm, GuessRecord};
use crate::transport::{GuessEndpoint, SubmitError, SuggestionEndpoint, TransportError};
use crate::ui::{Anchor, Clipboard, ClipboardError, GameView, Notifier};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RecordingUi {
    pub guesses: Vec<String>,
    pub input: String,
    pub suggestions: Vec<String>,
    pub highlighted: Option<usize>,
    pub scrolled_to: Vec<usize>,
    pub hint_visible: bool,
    pub hint_bouncing: bool,
    pub hint_panel: Option<(String, String)>,
    pub detail: Option<(String, String)>,
    pub toasts: Vec<String>,
    pub blocking: Vec<(String, String, Event)>,
    pub summary: Option<GameSummary>,
    pub disabled_placeholder: Option<String>,
    pub clipboard: Vec<String>,
    pub clipboard_fails: bool,
}

impl GameView for RecordingUi {
    fn append_guess(&mut self, markup: &str) {
        self.guesses.push(markup.to_string());
    }

    fn set_input_value(&mut self, value: &str) {
        self.input = value.to_string();
    }

    fn render_suggestions(&mut self, labels: &[String]) {
        self.suggestions = labels.to_vec();
    }

    fn clear_suggestions(&mut self) {
        self.suggestions.clear();
        self.highlighted = None;
    }

    fn highlight_suggestion(&mut self, index: Option<usize>) {
        self.highlighted = index;
    }

    fn scroll_suggestion_into_view(&mut self, index: usize) {
        self.scrolled_to.push(index);
    }

    fn show_hint_affordance(&mut self) {
        self.hint_visible = true;
    }

    fn set_hint_bouncing(&mut self, bouncing: bool) {
        self.hint_bouncing = bouncing;
    }

    fn show_hint_panel(&mut self, title: &str, message: &str) {
        self.hint_panel = Some((title.to_string(), message.to_string()));
    }

    fn show_summary(&mut self, summary: &GameSummary) {
        self.summary = Some(summary.clone());
    }

    fn close_summary(&mut self) {
        self.summary = None;
    }

    fn disable_controls(&mut self, placeholder: &str) {
        self.disabled_placeholder = Some(placeholder.to_string());
    }
}

impl Notifier for RecordingUi {
    fn notify_transient(&mut self, text: &str) {
        self.toasts.push(text.to_string());
    }

    fn notify_blocking(&mut self, title: &str, text: &str, on_dismiss: Event) {
        self.blocking
            .push((title.to_string(), text.to_string(), on_dismiss));
    }

    fn show_detail(&mut self, _anchor: Anchor, title: &str, message: &str) {
        self.detail = Some((title.to_string(), message.to_string()));
    }

    fn hide_detail(&mut self, _anchor: Anchor) {
        self.detail = None;
    }
}

impl Clipboard for RecordingUi {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.clipboard_fails {
            return Err(ClipboardError::Unavailable);
        }
        self.clipboard.push(text.to_string());
        Ok(())
    }
}

/// Canned responses for both endpoints, recording every call.
#[derive(Clone, Default)]
pub struct ScriptedEndpoints {
    inner: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    guesses: VecDeque<Result<GuessRecord, SubmitError>>,
    suggestions: VecDeque<(Duration, Vec<String>)>,
    submitted: Vec<GuessForm>,
    queries: Vec<SuggestionQuery>,
}

impl ScriptedEndpoints {
    pub fn push_guess(&self, result: Result<GuessRecord, SubmitError>) {
        self.inner.lock().guesses.push_back(result);
    }

    /// Next suggestion response, delivered after `delay`.
    pub fn push_suggestions(&self, delay: Duration, labels: &[&str]) {
        self.inner.lock().suggestions.push_back((
            delay,
            labels.iter().map(|label| label.to_string()).collect(),
        ));
    }

    pub fn submitted(&self) -> Vec<GuessForm> {
        self.inner.lock().submitted.clone()
    }

    pub fn queries(&self) -> Vec<SuggestionQuery> {
        self.inner.lock().queries.clone()
    }
}

impl GuessEndpoint for ScriptedEndpoints {
    async fn submit(&self, form: GuessForm) -> Result<GuessRecord, SubmitError> {
        let mut script = self.inner.lock();
        script.submitted.push(form);
        script
            .guesses
            .pop_front()
            .unwrap_or(Err(TransportError::Status(503).into()))
    }
}

impl SuggestionEndpoint for ScriptedEndpoints {
    async fn suggest(&self, query: SuggestionQuery) -> Result<Vec<String>, TransportError> {
        let next = {
            let mut script = self.inner.lock();
            script.queries.push(query);
            script.suggestions.pop_front()
        };
        let (delay, labels) = next.unwrap_or_default();
        tokio::time::sleep(delay).await;
        Ok(labels)
    }
}
