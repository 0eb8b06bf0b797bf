use tracing::{debug, info, trace};

use crate::error::ControllerError;
use crate::navigation::phase::{
    ConnectionStatus, PlayerRecord, QuizState, Route, RouteParams, Snapshot,
};
use crate::navigation::reducer::{self, Effect, NavigationDecision};

/// The navigator the resolver drives.
pub trait NavigationSurface {
    /// Non-destructive navigation.
    fn navigate_soft(&mut self, route: Route, params: RouteParams);
    /// Destructive remount: the stack is replaced by a fresh instance.
    fn reset_to(&mut self, route: Route, index: usize, params: RouteParams);
    fn current_route(&self) -> Option<Route>;
    fn is_ready(&self) -> bool;
}

/// Source of the player record. `refetch` is fire-and-forget and safe to
/// call redundantly.
pub trait PlayerFeed {
    fn refetch(&mut self);
}

/// What one `process` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub navigation: Option<NavigationDecision>,
    pub refetched: bool,
}

/// Applies navigation decisions for the latest feed snapshot.
///
/// Feed updates only overwrite the held values; nothing is queued. `process`
/// evaluates whatever is newest at that moment, so updates that arrive
/// between two calls collapse into one evaluation. An evaluation whose
/// snapshot equals the last applied one is skipped entirely.
#[derive(Debug, Default)]
pub struct ScreenResolver {
    player: Option<PlayerRecord>,
    quiz: Option<QuizState>,
    status: ConnectionStatus,
    /// Updates received since the last evaluation.
    pending: usize,
    last_applied: Option<Snapshot>,
}

impl ScreenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn player(&self) -> Option<PlayerRecord> {
        self.player
    }

    pub fn quiz(&self) -> Option<QuizState> {
        self.quiz
    }

    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn on_player(&mut self, record: PlayerRecord) {
        self.player = Some(record);
        self.pending += 1;
    }

    pub fn on_quiz(&mut self, state: QuizState) {
        self.quiz = Some(state);
        self.pending += 1;
    }

    pub fn on_status(&mut self, status: ConnectionStatus) {
        if status == self.status {
            return;
        }
        info!(?status, "quiz feed connection changed");
        self.status = status;
        // Reconnecting re-evaluates whatever arrived while suspended.
        if status == ConnectionStatus::Connected {
            self.pending += 1;
        }
    }

    /// Evaluates the newest snapshot and applies the decision. Returns `None`
    /// when nothing was evaluated or the snapshot was already applied.
    pub fn process(
        &mut self,
        surface: &mut impl NavigationSurface,
        feed: &mut impl PlayerFeed,
    ) -> Option<Resolution> {
        if self.pending == 0 {
            return None;
        }
        if self.pending > 1 {
            let err = ControllerError::StaleSnapshotRace {
                dropped: self.pending - 1,
            };
            trace!(error = %err, "collapsing feed updates");
        }

        let snapshot = match self.snapshot(surface) {
            Ok(snapshot) => snapshot,
            Err(err @ ControllerError::NavigationSurfaceNotReady) => {
                // Keep the update pending; the next call retries.
                debug!(error = %err, "navigation deferred");
                self.pending = 1;
                return None;
            }
            Err(err) => {
                debug!(error = %err, "navigation skipped");
                self.pending = 0;
                return None;
            }
        };
        self.pending = 0;

        if self.last_applied == Some(snapshot) {
            trace!(?snapshot, "snapshot already applied");
            return None;
        }

        let reduction = reducer::reduce(surface.current_route(), &snapshot);
        if let Some(decision) = reduction.navigation {
            if decision.force_remount {
                info!(route = decision.target.as_str(), "resetting to fresh screen");
                surface.reset_to(decision.target, decision.target.reset_index(), decision.params);
            } else {
                info!(route = decision.target.as_str(), "navigating");
                surface.navigate_soft(decision.target, decision.params);
            }
        }
        let mut refetched = false;
        for effect in &reduction.effects {
            match effect {
                Effect::RefetchPlayer => {
                    debug!(phase = snapshot.quiz.state.as_str(), "refetching player");
                    feed.refetch();
                    refetched = true;
                }
            }
        }
        self.last_applied = Some(snapshot);
        Some(Resolution {
            navigation: reduction.navigation,
            refetched,
        })
    }

    fn snapshot(&self, surface: &impl NavigationSurface) -> Result<Snapshot, ControllerError> {
        if self.status != ConnectionStatus::Connected {
            return Err(ControllerError::MissingPrerequisite("connected quiz feed"));
        }
        let player = self
            .player
            .ok_or(ControllerError::MissingPrerequisite("player record"))?;
        let quiz = self
            .quiz
            .ok_or(ControllerError::MissingPrerequisite("quiz phase"))?;
        let snapshot = Snapshot {
            player_active: player.is_active,
            quiz,
        };
        if !surface.is_ready() {
            return Err(ControllerError::NavigationSurfaceNotReady);
        }
        Ok(snapshot)
    }
}
