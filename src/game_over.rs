use crate::autocomplete::AutocompleteController;
use crate::bootstrap::BirdInfo;
use crate::ui::{Clipboard, GameView, Notifier};
use serde::Serialize;
use tracing::{info, warn};

const BIRDS_ARENT_REAL_URL: &str = "https://birdsarentreal.com/";

pub fn pluralize(count: u32, noun: &str, suffix: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}{suffix}")
    }
}

fn placeholder(is_winner: bool) -> &'static str {
    if is_winner {
        "You won!"
    } else {
        "Better luck tomorrow!"
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

/// End-of-game card. `message` is Markdown with inline links.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct GameSummary {
    pub outcome: Outcome,
    pub title: String,
    pub message: String,
    pub guess_count: u32,
    pub bird: BirdInfo,
    pub emojis: String,
}

impl GameSummary {
    pub fn new(guess_count: u32, is_winner: bool, bird: BirdInfo, emojis: String) -> Self {
        let link = format!("[{}]({})", bird.name, bird.url);
        let (outcome, title, message) = if is_winner {
            (
                Outcome::Win,
                "Congratulations!",
                format!(
                    "You got today's Birdle in {}.\nLearn more about the {link}.",
                    pluralize(guess_count, "guess", "es")
                ),
            )
        } else {
            (
                Outcome::Loss,
                "Oh no!",
                format!(
                    "Today's bird was the {link}. But don't fret, [birds aren't real]({BIRDS_ARENT_REAL_URL}) anyway."
                ),
            )
        };
        Self {
            outcome,
            title: title.to_string(),
            message,
            guess_count,
            bird,
            emojis,
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }

    pub fn placeholder(&self) -> &'static str {
        placeholder(self.is_win())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SummaryAction {
    CopyResults,
    Close,
}

/// Shows the summary once the game is over and keeps the controls frozen.
#[derive(Debug, Default)]
pub struct GameOverPresenter {
    summary: Option<GameSummary>,
    controls_disabled: bool,
}

impl GameOverPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> Option<&GameSummary> {
        self.summary.as_ref()
    }

    pub fn controls_disabled(&self) -> bool {
        self.controls_disabled
    }

    pub fn present(&mut self, summary: GameSummary, view: &mut impl GameView) {
        info!(outcome = ?summary.outcome, guesses = summary.guess_count, "game over");
        view.show_summary(&summary);
        self.summary = Some(summary);
    }

    pub fn on_action<U: GameView + Notifier + Clipboard>(&mut self, action: SummaryAction, ui: &mut U) {
        let Some(summary) = &self.summary else {
            return;
        };
        match action {
            SummaryAction::CopyResults => match ui.write_text(&summary.emojis) {
                Ok(()) => ui.notify_transient("Copied!"),
                Err(err) => warn!(error = %err, "failed to copy results"),
            },
            SummaryAction::Close => ui.close_summary(),
        }
    }

    /// Disables the guess controls and autocomplete. Nothing re-enables them.
    pub fn disable_game_controls(
        &mut self,
        is_winner: bool,
        autocomplete: &mut AutocompleteController,
        view: &mut impl GameView,
    ) {
        if self.controls_disabled {
            return;
        }
        self.controls_disabled = true;
        autocomplete.disable(view);
        view.disable_controls(placeholder(is_winner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingUi;

    fn robin() -> BirdInfo {
        BirdInfo {
            name: "American Robin".to_string(),
            url: "https://example.org/robin".to_string(),
        }
    }

    #[test]
    fn pluralize_guesses() {
        assert_eq!(pluralize(1, "guess", "es"), "1 guess");
        assert_eq!(pluralize(4, "guess", "es"), "4 guesses");
        assert_eq!(pluralize(0, "guess", "es"), "0 guesses");
    }

    #[test]
    fn win_summary_counts_guesses_and_links_bird() {
        let summary = GameSummary::new(1, true, robin(), "🟩".to_string());
        assert_eq!(summary.title, "Congratulations!");
        assert!(summary.message.contains("in 1 guess."));
        assert!(summary.message.contains("[American Robin](https://example.org/robin)"));
        assert_eq!(summary.placeholder(), "You won!");
    }

    #[test]
    fn loss_summary_reveals_answer() {
        let summary = GameSummary::new(6, false, robin(), "🟥🟥🟥🟥🟥🟥".to_string());
        assert_eq!(summary.title, "Oh no!");
        assert!(summary.message.starts_with("Today's bird was the [American Robin]"));
        assert!(summary.message.contains(BIRDS_ARENT_REAL_URL));
        assert_eq!(summary.placeholder(), "Better luck tomorrow!");
    }

    #[test]
    fn copy_action_copies_emojis_and_toasts() {
        let mut presenter = GameOverPresenter::new();
        let mut ui = RecordingUi::default();
        presenter.present(
            GameSummary::new(6, false, robin(), "🟥🟥🟥🟥🟥🟥".to_string()),
            &mut ui,
        );
        presenter.on_action(SummaryAction::CopyResults, &mut ui);
        assert_eq!(ui.clipboard, vec!["🟥🟥🟥🟥🟥🟥".to_string()]);
        assert_eq!(ui.toasts, vec!["Copied!".to_string()]);
    }

    #[test]
    fn failed_copy_shows_no_toast() {
        let mut presenter = GameOverPresenter::new();
        let mut ui = RecordingUi {
            clipboard_fails: true,
            ..RecordingUi::default()
        };
        presenter.present(GameSummary::new(2, true, robin(), "🟩".to_string()), &mut ui);
        presenter.on_action(SummaryAction::CopyResults, &mut ui);
        assert!(ui.toasts.is_empty());
    }

    #[test]
    fn close_dismisses_summary() {
        let mut presenter = GameOverPresenter::new();
        let mut ui = RecordingUi::default();
        presenter.present(GameSummary::new(2, true, robin(), String::new()), &mut ui);
        assert!(ui.summary.is_some());
        presenter.on_action(SummaryAction::Close, &mut ui);
        assert!(ui.summary.is_none());
    }

    #[test]
    fn disabling_controls_sets_placeholder_and_stops_autocomplete() {
        let mut presenter = GameOverPresenter::new();
        let mut autocomplete = AutocompleteController::new();
        let mut ui = RecordingUi::default();
        presenter.disable_game_controls(true, &mut autocomplete, &mut ui);
        assert!(presenter.controls_disabled());
        assert!(!autocomplete.is_enabled());
        assert_eq!(ui.disabled_placeholder.as_deref(), Some("You won!"));
    }
}
