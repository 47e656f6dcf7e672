use crate::ui::{Anchor, GameView, Notifier};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Message the server sends once the game is over; no popover is opened for it.
pub const GAME_OVER_HINT_MESSAGE: &str = "The game's over. Go outside.";

/// Wait before opening the popover so the affordance has been laid out.
pub const DETAIL_SETTLE_DELAY: Duration = Duration::from_millis(100);

pub const BOUNCE_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HintPayload {
    #[serde(default)]
    pub show: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

impl HintPayload {
    pub fn is_game_over(&self) -> bool {
        self.message == GAME_OVER_HINT_MESSAGE
    }
}

/// Timers a `present` call needs.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HintPresentation {
    pub bounce_for: Duration,
    /// Settle delay and the revision the detail popover must still match.
    pub open_detail: Option<(Duration, u64)>,
}

/// The single hint affordance of a session.
#[derive(Debug, Default)]
pub struct HintController {
    visible: bool,
    used: bool,
    pending: Option<HintPayload>,
    revision: u64,
    detail_open: bool,
    suppressed: bool,
}

impl HintController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the player opted into the hint; sent with every later guess.
    pub fn used(&self) -> bool {
        self.used
    }

    pub fn is_detail_open(&self) -> bool {
        self.detail_open
    }

    /// Shows the affordance for `payload`. A newer payload replaces whatever
    /// is still pending.
    pub fn present(&mut self, payload: HintPayload, view: &mut impl GameView) -> Option<HintPresentation> {
        if !payload.show {
            return None;
        }
        self.visible = true;
        view.show_hint_affordance();
        view.set_hint_bouncing(true);
        self.revision += 1;
        let open_detail = if payload.is_game_over() || self.suppressed {
            None
        } else {
            Some((DETAIL_SETTLE_DELAY, self.revision))
        };
        self.pending = Some(payload);
        Some(HintPresentation {
            bounce_for: BOUNCE_DURATION,
            open_detail,
        })
    }

    pub fn end_bounce(&mut self, view: &mut impl GameView) {
        view.set_hint_bouncing(false);
    }

    /// Opens the popover once the settle delay elapsed, unless a newer
    /// payload arrived in between or the game ended.
    pub fn open_detail(&mut self, revision: u64, notifier: &mut impl Notifier) {
        if revision != self.revision || self.suppressed {
            debug!(revision, current = self.revision, "skipping superseded hint popover");
            return;
        }
        let Some(payload) = &self.pending else {
            return;
        };
        notifier.show_detail(Anchor::HintAffordance, &payload.title, &payload.message);
        self.detail_open = true;
    }

    pub fn accept<U: GameView + Notifier>(&mut self, ui: &mut U) {
        if !self.detail_open {
            return;
        }
        self.used = true;
        self.detail_open = false;
        ui.hide_detail(Anchor::HintAffordance);
        if let Some(payload) = self.pending.take() {
            ui.show_hint_panel(&payload.title, &payload.message);
        }
    }

    pub fn decline(&mut self, notifier: &mut impl Notifier) {
        if !self.detail_open {
            return;
        }
        self.detail_open = false;
        self.pending = None;
        notifier.hide_detail(Anchor::HintAffordance);
    }

    /// No popovers once the game is over.
    pub fn suppress(&mut self, notifier: &mut impl Notifier) {
        self.suppressed = true;
        if self.detail_open {
            self.detail_open = false;
            notifier.hide_detail(Anchor::HintAffordance);
        }
    }
}
