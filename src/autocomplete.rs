use crate::taxonomy::TaxonomyState;
use crate::ui::{FocusTarget, GameView, Key};
use std::time::Duration;
use tracing::debug;

/// How long the list survives a blur to somewhere other than the submit
/// control, so a pointer click on a suggestion still lands.
pub const DISMISS_GRACE: Duration = Duration::from_millis(200);

/// Highlighted suggestion. `None` is "no selection" (index -1).
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SelectionState(Option<usize>);

impl SelectionState {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn index(&self) -> Option<usize> {
        self.0
    }

    /// Index in `[-1, item_count - 1]` form.
    pub fn as_signed(&self) -> isize {
        self.0.map(|idx| idx as isize).unwrap_or(-1)
    }

    fn next(self, item_count: usize) -> Self {
        let last = item_count.saturating_sub(1);
        match self.0 {
            None => Self(Some(0)),
            Some(idx) => Self(Some((idx + 1).min(last))),
        }
    }

    fn previous(self) -> Option<Self> {
        match self.0 {
            Some(idx) if idx > 0 => Some(Self(Some(idx - 1))),
            _ => None,
        }
    }
}

/// A suggestion fetch the driver should perform.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SuggestionRequest {
    pub seq: u64,
    pub query: SuggestionQuery,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SuggestionQuery {
    pub text: String,
    pub filter: TaxonomyState,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyOutcome {
    /// The controller handled the key; its default action is suppressed.
    Handled,
    /// The key keeps its default action.
    PassThrough,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BlurOutcome {
    Dismissed,
    DismissAfter(Duration),
}

/// Binds the guess input to the live suggestion list.
#[derive(Debug)]
pub struct AutocompleteController {
    input: String,
    items: Vec<String>,
    selection: SelectionState,
    next_seq: u64,
    awaiting: Option<u64>,
    blur_pending: bool,
    enabled: bool,
}

impl Default for AutocompleteController {
    fn default() -> Self {
        Self {
            input: String::new(),
            items: Vec::new(),
            selection: SelectionState::none(),
            next_seq: 0,
            awaiting: None,
            blur_pending: false,
            enabled: true,
        }
    }
}

impl AutocompleteController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The input changed. Returns the fetch to issue, tagged with a fresh
    /// sequence number that supersedes every earlier request.
    pub fn on_input(
        &mut self,
        value: String,
        filter: TaxonomyState,
        view: &mut impl GameView,
    ) -> Option<SuggestionRequest> {
        self.input = value;
        self.blur_pending = false;
        self.select(SelectionState::none(), view);
        if !self.enabled {
            return None;
        }
        if self.input.trim().is_empty() {
            self.dismiss(view);
            return None;
        }
        self.next_seq += 1;
        self.awaiting = Some(self.next_seq);
        Some(SuggestionRequest {
            seq: self.next_seq,
            query: SuggestionQuery {
                text: self.input.clone(),
                filter,
            },
        })
    }

    /// Applies a suggestion response. Returns false when it was stale.
    pub fn on_suggestions(&mut self, seq: u64, labels: Vec<String>, view: &mut impl GameView) -> bool {
        if !self.enabled || self.awaiting != Some(seq) {
            debug!(seq, latest = ?self.awaiting, "dropping stale suggestions");
            return false;
        }
        self.awaiting = None;
        self.items = labels;
        self.selection = SelectionState::none();
        if self.items.is_empty() {
            view.clear_suggestions();
        } else {
            view.render_suggestions(&self.items);
        }
        true
    }

    pub fn on_key_down(&mut self, key: Key, view: &mut impl GameView) -> KeyOutcome {
        if key == Key::Tab {
            if !self.items.is_empty() {
                self.dismiss(view);
            }
            return KeyOutcome::PassThrough;
        }
        if self.items.is_empty() {
            return KeyOutcome::PassThrough;
        }
        match key {
            Key::ArrowDown => {
                let next = self.selection.next(self.items.len());
                self.select(next, view);
                KeyOutcome::Handled
            }
            Key::ArrowUp => {
                if let Some(previous) = self.selection.previous() {
                    self.select(previous, view);
                }
                KeyOutcome::Handled
            }
            Key::Enter => match self.selection.index() {
                Some(index) => {
                    self.commit(index, view);
                    KeyOutcome::Handled
                }
                None => KeyOutcome::PassThrough,
            },
            Key::Tab | Key::Other => KeyOutcome::PassThrough,
        }
    }

    pub fn on_blur(&mut self, related: FocusTarget, view: &mut impl GameView) -> BlurOutcome {
        match related {
            FocusTarget::SubmitControl => {
                self.dismiss(view);
                BlurOutcome::Dismissed
            }
            FocusTarget::Elsewhere => {
                self.blur_pending = true;
                BlurOutcome::DismissAfter(DISMISS_GRACE)
            }
        }
    }

    /// The grace delay after a blur ran out. Typing since the blur means the
    /// input is in use again, so the list and its request stay.
    pub fn on_grace_elapsed(&mut self, view: &mut impl GameView) {
        if std::mem::take(&mut self.blur_pending) {
            self.dismiss(view);
        }
    }

    /// A pointer click on a rendered suggestion.
    pub fn on_click(&mut self, index: usize, view: &mut impl GameView) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.commit(index, view);
        true
    }

    /// Empties the suggestion list and abandons any in-flight request.
    pub fn dismiss(&mut self, view: &mut impl GameView) {
        self.items.clear();
        self.awaiting = None;
        self.select(SelectionState::none(), view);
        view.clear_suggestions();
    }

    pub fn clear_input(&mut self, view: &mut impl GameView) {
        self.input.clear();
        view.set_input_value("");
        self.dismiss(view);
    }

    /// Stops all suggestion traffic for the rest of the session.
    pub fn disable(&mut self, view: &mut impl GameView) {
        self.dismiss(view);
        self.enabled = false;
    }

    fn commit(&mut self, index: usize, view: &mut impl GameView) {
        let Some(label) = self.items.get(index) else {
            return;
        };
        self.input = label.trim().to_string();
        view.set_input_value(&self.input);
        self.dismiss(view);
    }

    fn select(&mut self, next: SelectionState, view: &mut impl GameView) {
        if next == self.selection {
            return;
        }
        self.selection = next;
        view.highlight_suggestion(next.index());
        if let Some(index) = next.index() {
            view.scroll_suggestion_into_view(index);
        }
    }
}
