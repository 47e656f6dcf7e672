use crate::autocomplete::{AutocompleteController, BlurOutcome, KeyOutcome, SuggestionQuery, SuggestionRequest};
use crate::bootstrap::{BirdInfo, GameSessionConfig};
use crate::game_over::{GameOverPresenter, GameSummary, SummaryAction};
use crate::hint::{HintController, HintPayload};
use crate::identity::IdentityStore;
use crate::submission::{GuessForm, GuessRecord, GuessSubmissionFlow, RoundOutcome, SubmissionPhase};
use crate::taxonomy::TaxonomyFilter;
use crate::transport::{SubmitError, TransportError};
use crate::ui::{Clipboard, FocusTarget, GameView, Key, Notifier};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const INVALID_GUESS_MESSAGE: &str = "That bird doesn't exist!";
pub const EXPIRED_TITLE: &str = "Game Expired";
pub const EXPIRED_MESSAGE: &str = "A new daily bird is now available. Refreshing...";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Timer {
    DismissSuggestions,
    EndHintBounce,
    OpenHintDetail { revision: u64 },
}

#[derive(Debug)]
pub enum Event {
    Input(String),
    KeyDown(Key),
    Blur(FocusTarget),
    SuggestionClicked(usize),
    Submit,
    SuggestionsLoaded {
        seq: u64,
        query: SuggestionQuery,
        result: Result<Vec<String>, TransportError>,
    },
    GuessCompleted {
        ticket: u64,
        result: Result<GuessRecord, SubmitError>,
    },
    TimerFired(Timer),
    HintAccepted,
    HintDeclined,
    Summary(SummaryAction),
    ReloadPage,
    Quit,
}

/// Work the driver performs on the session's behalf.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Effect {
    FetchSuggestions(SuggestionRequest),
    SubmitGuess { ticket: u64, form: GuessForm },
    Schedule { after: Duration, timer: Timer },
    Reload,
    Exit,
}

/// One page load of the game: owns every controller and routes events
/// between them.
pub struct GameSession<U, I> {
    taxonomy: TaxonomyFilter,
    autocomplete: AutocompleteController,
    hint: HintController,
    flow: GuessSubmissionFlow,
    presenter: GameOverPresenter,
    bird: BirdInfo,
    emojis: String,
    reload_requested: bool,
    ui: U,
    identity: I,
}

impl<U, I> GameSession<U, I>
where
    U: GameView + Notifier + Clipboard,
    I: IdentityStore,
{
    /// Builds the session from the page bootstrap. A finished game goes
    /// straight to the summary with the controls frozen.
    pub fn start(config: GameSessionConfig, ui: U, identity: I) -> (Self, Vec<Effect>) {
        let mut session = Self {
            taxonomy: TaxonomyFilter::new(),
            autocomplete: AutocompleteController::new(),
            hint: HintController::new(),
            flow: GuessSubmissionFlow::new(config.guess_count, config.is_winner),
            presenter: GameOverPresenter::new(),
            bird: config.bird,
            emojis: config.emojis,
            reload_requested: false,
            ui,
            identity,
        };
        let mut effects = Vec::new();
        if session.flow.is_terminal() {
            session.finish_game(config.guess_count, config.is_winner);
        } else if let Some(hint) = config.hint {
            session.present_hint(hint, &mut effects);
        }
        if let Some(taxonomy) = &config.correct_taxonomy {
            session.taxonomy.update(taxonomy);
        }
        info!(
            guess_count = config.guess_count,
            terminal = session.flow.is_terminal(),
            "game session started"
        );
        (session, effects)
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn taxonomy(&self) -> &TaxonomyFilter {
        &self.taxonomy
    }

    pub fn autocomplete(&self) -> &AutocompleteController {
        &self.autocomplete
    }

    pub fn hint(&self) -> &HintController {
        &self.hint
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.flow.phase()
    }

    pub fn guess_count(&self) -> u32 {
        self.flow.guess_count()
    }

    pub fn summary(&self) -> Option<&GameSummary> {
        self.presenter.summary()
    }

    pub fn controls_disabled(&self) -> bool {
        self.presenter.controls_disabled()
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::Input(value) => {
                let filter = self.taxonomy.current_filter();
                if let Some(request) = self.autocomplete.on_input(value, filter, &mut self.ui) {
                    effects.push(Effect::FetchSuggestions(request));
                }
            }
            Event::KeyDown(key) => {
                let outcome = self.autocomplete.on_key_down(key, &mut self.ui);
                if key == Key::Enter && outcome == KeyOutcome::PassThrough {
                    self.submit(&mut effects);
                }
            }
            Event::Blur(related) => {
                if let BlurOutcome::DismissAfter(after) = self.autocomplete.on_blur(related, &mut self.ui) {
                    effects.push(Effect::Schedule {
                        after,
                        timer: Timer::DismissSuggestions,
                    });
                }
            }
            Event::SuggestionClicked(index) => {
                self.autocomplete.on_click(index, &mut self.ui);
            }
            Event::Submit => self.submit(&mut effects),
            Event::SuggestionsLoaded { seq, result, .. } => match result {
                Ok(labels) => {
                    self.autocomplete.on_suggestions(seq, labels, &mut self.ui);
                }
                Err(err) => warn!(seq, error = %err, "suggestion fetch failed"),
            },
            Event::GuessCompleted { ticket, result } => self.complete_round(ticket, result, &mut effects),
            Event::TimerFired(timer) => self.fire(timer),
            Event::HintAccepted => self.hint.accept(&mut self.ui),
            Event::HintDeclined => self.hint.decline(&mut self.ui),
            Event::Summary(action) => self.presenter.on_action(action, &mut self.ui),
            Event::ReloadPage => {
                if self.reload_requested {
                    debug!("reload already requested");
                } else {
                    self.reload_requested = true;
                    effects.push(Effect::Reload);
                }
            }
            Event::Quit => effects.push(Effect::Exit),
        }
        effects
    }

    fn submit(&mut self, effects: &mut Vec<Effect>) {
        let user_id = self.identity.client_id().unwrap_or_default();
        match self
            .flow
            .begin(self.autocomplete.input(), user_id, self.hint.used())
        {
            Ok((ticket, form)) => effects.push(Effect::SubmitGuess { ticket, form }),
            Err(rejected) => debug!(reason = %rejected, "guess not submitted"),
        }
    }

    fn complete_round(
        &mut self,
        ticket: u64,
        result: Result<GuessRecord, SubmitError>,
        effects: &mut Vec<Effect>,
    ) {
        match self.flow.finish(ticket, result) {
            RoundOutcome::Applied { record, terminal } => {
                self.ui.append_guess(&record.new_guess);
                self.autocomplete.clear_input(&mut self.ui);
                if let Some(taxonomy) = &record.taxonomy {
                    self.taxonomy.update(taxonomy);
                }
                if let Some(hint) = record.hint {
                    self.present_hint(hint, effects);
                }
                if terminal {
                    if let Some(bird) = record.bird {
                        self.bird = bird;
                    }
                    if let Some(emojis) = record.emojis {
                        self.emojis = emojis;
                    }
                    self.finish_game(self.flow.guess_count(), record.is_winner);
                }
            }
            RoundOutcome::InvalidGuess => {
                self.autocomplete.clear_input(&mut self.ui);
                self.ui.notify_transient(INVALID_GUESS_MESSAGE);
            }
            RoundOutcome::Expired => {
                self.ui
                    .notify_blocking(EXPIRED_TITLE, EXPIRED_MESSAGE, Event::ReloadPage);
            }
            RoundOutcome::Failed | RoundOutcome::Ignored => {}
        }
    }

    fn present_hint(&mut self, payload: HintPayload, effects: &mut Vec<Effect>) {
        let Some(presentation) = self.hint.present(payload, &mut self.ui) else {
            return;
        };
        effects.push(Effect::Schedule {
            after: presentation.bounce_for,
            timer: Timer::EndHintBounce,
        });
        if let Some((after, revision)) = presentation.open_detail {
            effects.push(Effect::Schedule {
                after,
                timer: Timer::OpenHintDetail { revision },
            });
        }
    }

    fn finish_game(&mut self, guess_count: u32, is_winner: bool) {
        let summary = GameSummary::new(guess_count, is_winner, self.bird.clone(), self.emojis.clone());
        self.hint.suppress(&mut self.ui);
        self.presenter.present(summary, &mut self.ui);
        self.presenter
            .disable_game_controls(is_winner, &mut self.autocomplete, &mut self.ui);
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::DismissSuggestions => self.autocomplete.on_grace_elapsed(&mut self.ui),
            Timer::EndHintBounce => self.hint.end_bounce(&mut self.ui),
            Timer::OpenHintDetail { revision } => self.hint.open_detail(revision, &mut self.ui),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::{DETAIL_SETTLE_DELAY, GAME_OVER_HINT_MESSAGE};
    use crate::identity::EphemeralIdentity;
    use crate::taxonomy::TaxonomyState;
    use crate::test_support::RecordingUi;

    type Session = GameSession<RecordingUi, EphemeralIdentity>;

    fn fresh() -> Session {
        let config = GameSessionConfig {
            bird: BirdInfo {
                name: "American Robin".to_string(),
                url: "https://example.org/robin".to_string(),
            },
            ..GameSessionConfig::default()
        };
        let (session, effects) = GameSession::start(config, RecordingUi::default(), EphemeralIdentity::new("player-1"));
        assert!(effects.is_empty());
        session
    }

    fn submit(session: &mut Session, guess: &str) -> u64 {
        session.handle(Event::Input(guess.to_string()));
        let effects = session.handle(Event::Submit);
        match effects.as_slice() {
            [Effect::SubmitGuess { ticket, form }] => {
                assert_eq!(form.guess, guess);
                *ticket
            }
            other => panic!("expected a submission, got {other:?}"),
        }
    }

    fn record(markup: &str, count: u32, winner: bool) -> GuessRecord {
        GuessRecord {
            new_guess: markup.to_string(),
            guess_count: count,
            is_winner: winner,
            ..GuessRecord::default()
        }
    }

    fn hint(message: &str) -> HintPayload {
        HintPayload {
            show: true,
            title: "Clue".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn wrong_guess_appends_and_clears_input() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Robin");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(record("<li>Robin ❌</li>", 1, false)),
        });
        assert_eq!(session.ui().guesses, vec!["<li>Robin ❌</li>".to_string()]);
        assert_eq!(session.ui().input, "");
        assert_eq!(session.autocomplete().input(), "");
        assert!(session.ui().disabled_placeholder.is_none());
        assert!(!session.controls_disabled());
        assert_eq!(session.phase(), SubmissionPhase::Idle);
    }

    #[test]
    fn submission_carries_identity_and_hint_flag() {
        let mut session = fresh();
        session.handle(Event::Input("Rook".to_string()));
        let effects = session.handle(Event::Submit);
        let Some(Effect::SubmitGuess { form, .. }) = effects.first() else {
            panic!("expected a submission");
        };
        assert_eq!(form.user_id, "player-1");
        assert!(!form.hint_used);
    }

    #[test]
    fn sixth_guess_loses_and_copies_emojis() {
        let mut session = fresh();
        for round in 1..=5 {
            let ticket = submit(&mut session, "Rook");
            session.handle(Event::GuessCompleted {
                ticket,
                result: Ok(record("<li>Rook ❌</li>", round, false)),
            });
        }
        let ticket = submit(&mut session, "Crow");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(GuessRecord {
                emojis: Some("🟥🟥🟥🟥🟥🟥".to_string()),
                ..record("<li>Crow ❌</li>", 6, false)
            }),
        });
        let summary = session.summary().expect("summary shown");
        assert_eq!(summary.title, "Oh no!");
        assert!(session.controls_disabled());
        assert_eq!(
            session.ui().disabled_placeholder.as_deref(),
            Some("Better luck tomorrow!")
        );
        session.handle(Event::Summary(SummaryAction::CopyResults));
        assert_eq!(session.ui().clipboard, vec!["🟥🟥🟥🟥🟥🟥".to_string()]);
        assert_eq!(session.ui().toasts, vec!["Copied!".to_string()]);
    }

    #[test]
    fn terminal_session_ignores_all_further_events() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Robin");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(record("<li>Robin ✅</li>", 1, true)),
        });
        assert!(session.summary().unwrap().message.contains("1 guess."));
        for event in [
            Event::Input("Rook".to_string()),
            Event::KeyDown(Key::Enter),
            Event::Submit,
            Event::Blur(FocusTarget::SubmitControl),
        ] {
            let effects = session.handle(event);
            assert!(effects.is_empty());
        }
        assert!(session.controls_disabled());
        assert_eq!(session.ui().disabled_placeholder.as_deref(), Some("You won!"));
    }

    #[test]
    fn invalid_guess_toasts_and_keeps_round() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Dodo");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Err(SubmitError::InvalidGuess),
        });
        assert_eq!(session.ui().toasts, vec![INVALID_GUESS_MESSAGE.to_string()]);
        assert!(session.ui().guesses.is_empty());
        assert_eq!(session.ui().input, "");
        assert_eq!(session.guess_count(), 0);
        assert_eq!(session.phase(), SubmissionPhase::Idle);
    }

    #[test]
    fn expired_session_blocks_then_reloads_once() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Robin");
        let effects = session.handle(Event::GuessCompleted {
            ticket,
            result: Err(SubmitError::SessionExpired),
        });
        assert!(effects.is_empty());
        assert!(session.ui().guesses.is_empty());
        assert_eq!(session.ui().blocking.len(), 1);
        assert_eq!(session.ui().blocking[0].0, EXPIRED_TITLE);

        let first = session.handle(Event::ReloadPage);
        let second = session.handle(Event::ReloadPage);
        assert_eq!(first, vec![Effect::Reload]);
        assert!(second.is_empty());
        assert!(session.handle(Event::Submit).is_empty());
    }

    #[test]
    fn transport_failure_is_silent() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Robin");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Err(TransportError::Status(500).into()),
        });
        assert!(session.ui().guesses.is_empty());
        assert!(session.ui().toasts.is_empty());
        assert_eq!(session.autocomplete().input(), "Robin");
        assert_eq!(session.phase(), SubmissionPhase::Idle);
    }

    #[test]
    fn overlapping_submit_is_dropped() {
        let mut session = fresh();
        submit(&mut session, "Robin");
        assert!(session.handle(Event::Submit).is_empty());
    }

    #[test]
    fn enter_without_selection_submits() {
        let mut session = fresh();
        session.handle(Event::Input("Robin".to_string()));
        let effects = session.handle(Event::KeyDown(Key::Enter));
        assert!(matches!(effects.as_slice(), [Effect::SubmitGuess { .. }]));
    }

    #[test]
    fn enter_on_selection_commits_instead_of_submitting() {
        let mut session = fresh();
        let effects = session.handle(Event::Input("rob".to_string()));
        let [Effect::FetchSuggestions(request)] = effects.as_slice() else {
            panic!("expected a suggestion fetch");
        };
        let request = request.clone();
        session.handle(Event::SuggestionsLoaded {
            seq: request.seq,
            query: request.query,
            result: Ok(vec!["American Robin".to_string(), "European Robin".to_string()]),
        });
        session.handle(Event::KeyDown(Key::ArrowDown));
        let effects = session.handle(Event::KeyDown(Key::Enter));
        assert!(effects.is_empty());
        assert_eq!(session.ui().input, "American Robin");
        assert!(session.ui().suggestions.is_empty());
    }

    #[test]
    fn revealed_taxonomy_filters_later_queries() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Blue Jay");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(GuessRecord {
                taxonomy: Some(TaxonomyState {
                    order: Some("Passeriformes".to_string()),
                    ..TaxonomyState::default()
                }),
                ..record("<li>Blue Jay</li>", 1, false)
            }),
        });
        let effects = session.handle(Event::Input("ro".to_string()));
        let [Effect::FetchSuggestions(request)] = effects.as_slice() else {
            panic!("expected a suggestion fetch");
        };
        assert_eq!(request.query.filter.order.as_deref(), Some("Passeriformes"));
    }

    #[test]
    fn mid_game_hint_opens_after_settle_delay() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Robin");
        let effects = session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(GuessRecord {
                hint: Some(hint("Lives near water")),
                ..record("<li>Robin ❌</li>", 1, false)
            }),
        });
        let opened = effects.iter().find_map(|effect| match effect {
            Effect::Schedule {
                after,
                timer: timer @ Timer::OpenHintDetail { .. },
            } => Some((*after, *timer)),
            _ => None,
        });
        let (after, timer) = opened.expect("popover scheduled");
        assert_eq!(after, DETAIL_SETTLE_DELAY);
        assert!(session.ui().detail.is_none());
        session.handle(Event::TimerFired(timer));
        assert_eq!(
            session.ui().detail,
            Some(("Clue".to_string(), "Lives near water".to_string()))
        );
        session.handle(Event::HintAccepted);
        assert!(session.hint().used());
        session.handle(Event::Input("Heron".to_string()));
        let effects = session.handle(Event::Submit);
        let Some(Effect::SubmitGuess { form, .. }) = effects.first() else {
            panic!("expected a submission");
        };
        assert!(form.hint_used);
    }

    #[test]
    fn game_over_hint_never_opens_popover() {
        let mut session = fresh();
        let ticket = submit(&mut session, "Robin");
        let effects = session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(GuessRecord {
                hint: Some(hint(GAME_OVER_HINT_MESSAGE)),
                ..record("<li>Robin ✅</li>", 1, true)
            }),
        });
        assert!(!effects.iter().any(|effect| matches!(
            effect,
            Effect::Schedule {
                timer: Timer::OpenHintDetail { .. },
                ..
            }
        )));
        assert!(session.ui().detail.is_none());
    }

    #[test]
    fn blur_elsewhere_schedules_grace_dismissal() {
        let mut session = fresh();
        let effects = session.handle(Event::Blur(FocusTarget::Elsewhere));
        assert_eq!(
            effects,
            vec![Effect::Schedule {
                after: crate::autocomplete::DISMISS_GRACE,
                timer: Timer::DismissSuggestions,
            }]
        );
    }

    #[test]
    fn grace_timer_after_typing_again_leaves_list_alone() {
        let mut session = fresh();
        session.handle(Event::Blur(FocusTarget::Elsewhere));
        let effects = session.handle(Event::Input("ro".to_string()));
        let [Effect::FetchSuggestions(request)] = effects.as_slice() else {
            panic!("expected a suggestion fetch");
        };
        let request = request.clone();
        session.handle(Event::TimerFired(Timer::DismissSuggestions));
        session.handle(Event::SuggestionsLoaded {
            seq: request.seq,
            query: request.query,
            result: Ok(vec!["Rook".to_string()]),
        });
        assert_eq!(session.ui().suggestions, vec!["Rook".to_string()]);
    }

    #[test]
    fn terminal_round_without_emojis_keeps_bootstrap_emojis() {
        let config = GameSessionConfig {
            guess_count: 5,
            emojis: "🟥🟥🟥🟥🟥".to_string(),
            ..GameSessionConfig::default()
        };
        let (mut session, _) = GameSession::start(config, RecordingUi::default(), EphemeralIdentity::anonymous());
        let ticket = submit(&mut session, "Crow");
        session.handle(Event::GuessCompleted {
            ticket,
            result: Ok(record("<li>Crow ❌</li>", 6, false)),
        });
        assert_eq!(session.summary().unwrap().emojis, "🟥🟥🟥🟥🟥");
        session.handle(Event::Summary(SummaryAction::CopyResults));
        assert_eq!(session.ui().clipboard, vec!["🟥🟥🟥🟥🟥".to_string()]);
    }

    #[test]
    fn finished_bootstrap_starts_terminal_without_hint() {
        let config = GameSessionConfig {
            guess_count: 3,
            is_winner: true,
            hint: Some(hint("Lives near water")),
            correct_taxonomy: Some(TaxonomyState {
                genus: Some("Turdus".to_string()),
                ..TaxonomyState::default()
            }),
            emojis: "🟥🟨🟩".to_string(),
            ..GameSessionConfig::default()
        };
        let (session, effects) = GameSession::start(config, RecordingUi::default(), EphemeralIdentity::anonymous());
        assert!(effects.is_empty());
        assert!(!session.ui().hint_visible);
        assert!(session.controls_disabled());
        assert_eq!(session.summary().unwrap().emojis, "🟥🟨🟩");
        assert_eq!(session.taxonomy().state().genus.as_deref(), Some("Turdus"));
    }

    #[test]
    fn fresh_bootstrap_presents_initial_hint() {
        let config = GameSessionConfig {
            guess_count: 2,
            hint: Some(hint("Lives near water")),
            ..GameSessionConfig::default()
        };
        let (session, effects) = GameSession::start(config, RecordingUi::default(), EphemeralIdentity::anonymous());
        assert!(session.ui().hint_visible);
        assert!(effects.contains(&Effect::Schedule {
            after: crate::hint::BOUNCE_DURATION,
            timer: Timer::EndHintBounce,
        }));
        assert_eq!(session.guess_count(), 2);
    }

    #[test]
    fn anonymous_player_sends_empty_id() {
        let (mut session, _) = GameSession::start(
            GameSessionConfig::default(),
            RecordingUi::default(),
            EphemeralIdentity::anonymous(),
        );
        session.handle(Event::Input("Robin".to_string()));
        let effects = session.handle(Event::Submit);
        let Some(Effect::SubmitGuess { form, .. }) = effects.first() else {
            panic!("expected a submission");
        };
        assert_eq!(form.user_id, "");
    }
}
