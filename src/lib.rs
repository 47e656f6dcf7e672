//! Client-side controller for the daily Birdle guessing game.
//!
//! Each controller is a synchronous state machine over the capability traits
//! in [`ui`]; [`session::GameSession`] routes events between them and
//! [`runtime::Driver`] performs the network calls and timers it asks for.

pub mod autocomplete;
pub mod bootstrap;
pub mod game_over;
pub mod hint;
pub mod identity;
pub mod runtime;
pub mod session;
pub mod submission;
pub mod taxonomy;
pub mod transport;
pub mod ui;

#[cfg(test)]
mod test_support;

/// A game ends after this many guesses even without a win.
pub const MAX_GUESSES: u32 = 6;

pub use autocomplete::{AutocompleteController, SuggestionQuery, SuggestionRequest};
pub use bootstrap::{BirdInfo, BootstrapError, GameSessionConfig};
pub use game_over::{GameOverPresenter, GameSummary, SummaryAction};
pub use hint::{HintController, HintPayload};
pub use identity::{EphemeralIdentity, FileIdentity, IdentityStore};
pub use runtime::{Driver, RunExit, RuntimeOptions};
pub use session::{Effect, Event, GameSession};
pub use submission::{GuessForm, GuessRecord, GuessSubmissionFlow};
pub use taxonomy::{TaxonomyFilter, TaxonomyRank, TaxonomyState};
#[cfg(feature = "http")]
pub use transport::HttpEndpoints;
pub use transport::{ClientConfig, GuessEndpoint, SubmitError, SuggestionEndpoint, TransportError};
pub use ui::{Clipboard, ClipboardError, GameView, Notifier};
