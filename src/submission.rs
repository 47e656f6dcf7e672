use crate::MAX_GUESSES;
use crate::bootstrap::BirdInfo;
use crate::hint::HintPayload;
use crate::taxonomy::TaxonomyState;
use crate::transport::SubmitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Body of a guess submission, form-encoded.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct GuessForm {
    pub guess: String,
    pub user_id: String,
    pub hint_used: bool,
}

/// Server's answer to an accepted guess.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub new_guess: String,
    pub guess_count: u32,
    #[serde(default)]
    pub is_winner: bool,
    #[serde(default)]
    pub taxonomy: Option<TaxonomyState>,
    #[serde(default)]
    pub hint: Option<HintPayload>,
    #[serde(default)]
    pub emojis: Option<String>,
    #[serde(default)]
    pub bird: Option<BirdInfo>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Terminal,
    /// A newer puzzle replaced this one; only a reload recovers.
    Expired,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubmitRejected {
    InFlight,
    GameOver,
    Expired,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::InFlight => write!(f, "a guess is already being submitted"),
            SubmitRejected::GameOver => write!(f, "the game is over"),
            SubmitRejected::Expired => write!(f, "the game has expired"),
        }
    }
}

impl std::error::Error for SubmitRejected {}

#[derive(Debug)]
pub enum RoundOutcome {
    Applied { record: GuessRecord, terminal: bool },
    InvalidGuess,
    Expired,
    Failed,
    /// A response for a request this flow no longer waits on.
    Ignored,
}

/// Guess round-trips: `Idle -> Submitting -> Idle | Terminal | Expired`.
#[derive(Debug)]
pub struct GuessSubmissionFlow {
    phase: SubmissionPhase,
    guess_count: u32,
    is_winner: bool,
    next_ticket: u64,
    in_flight: Option<u64>,
}

impl GuessSubmissionFlow {
    pub fn new(guess_count: u32, is_winner: bool) -> Self {
        let phase = if is_winner || guess_count >= MAX_GUESSES {
            SubmissionPhase::Terminal
        } else {
            SubmissionPhase::Idle
        };
        Self {
            phase,
            guess_count,
            is_winner,
            next_ticket: 0,
            in_flight: None,
        }
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn guess_count(&self) -> u32 {
        self.guess_count
    }

    pub fn is_winner(&self) -> bool {
        self.is_winner
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == SubmissionPhase::Terminal
    }

    /// Starts a round for the raw input value. Returns the request ticket and
    /// the form to post.
    pub fn begin(
        &mut self,
        guess: &str,
        user_id: String,
        hint_used: bool,
    ) -> Result<(u64, GuessForm), SubmitRejected> {
        match self.phase {
            SubmissionPhase::Idle => {}
            SubmissionPhase::Submitting => return Err(SubmitRejected::InFlight),
            SubmissionPhase::Terminal => return Err(SubmitRejected::GameOver),
            SubmissionPhase::Expired => return Err(SubmitRejected::Expired),
        }
        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        self.phase = SubmissionPhase::Submitting;
        debug!(ticket = self.next_ticket, guess, "submitting guess");
        Ok((
            self.next_ticket,
            GuessForm {
                guess: guess.to_string(),
                user_id,
                hint_used,
            },
        ))
    }

    /// Settles the round identified by `ticket`.
    pub fn finish(&mut self, ticket: u64, result: Result<GuessRecord, SubmitError>) -> RoundOutcome {
        if self.in_flight != Some(ticket) {
            warn!(ticket, "response for unknown submission");
            return RoundOutcome::Ignored;
        }
        self.in_flight = None;
        match result {
            Ok(record) => {
                if record.guess_count < self.guess_count {
                    warn!(
                        reported = record.guess_count,
                        known = self.guess_count,
                        "server reported a lower guess count"
                    );
                }
                self.guess_count = self.guess_count.max(record.guess_count);
                self.is_winner = record.is_winner;
                let terminal = record.is_winner || self.guess_count >= MAX_GUESSES;
                self.phase = if terminal {
                    SubmissionPhase::Terminal
                } else {
                    SubmissionPhase::Idle
                };
                info!(
                    guess_count = self.guess_count,
                    winner = record.is_winner,
                    terminal,
                    "guess applied"
                );
                RoundOutcome::Applied { record, terminal }
            }
            Err(SubmitError::InvalidGuess) => {
                self.phase = SubmissionPhase::Idle;
                debug!("guess not recognized");
                RoundOutcome::InvalidGuess
            }
            Err(SubmitError::SessionExpired) => {
                self.phase = SubmissionPhase::Expired;
                info!("game expired, reload required");
                RoundOutcome::Expired
            }
            Err(SubmitError::Transport(err)) => {
                self.phase = SubmissionPhase::Idle;
                warn!(error = %err, "guess submission failed");
                RoundOutcome::Failed
            }
        }
    }
}
