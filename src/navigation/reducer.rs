use crate::navigation::phase::{Route, RouteParams, Snapshot};

/// Side effects a decision asks the resolver to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    RefetchPlayer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationDecision {
    pub target: Route,
    /// Destructive reset to a fresh screen instance instead of a soft navigate.
    pub force_remount: bool,
    pub params: RouteParams,
}

/// Result of one evaluation. `navigation` is `None` when the decision is a
/// no-op for the current route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reduction {
    pub navigation: Option<NavigationDecision>,
    pub effects: Vec<Effect>,
}

/// Maps the latest snapshot to the route it calls for.
pub fn decide(snapshot: &Snapshot) -> NavigationDecision {
    let phase = snapshot.quiz.state;
    if !snapshot.player_active {
        return NavigationDecision {
            target: Route::Default,
            force_remount: false,
            params: RouteParams::default(),
        };
    }
    if phase.is_open() {
        return NavigationDecision {
            target: Route::Question,
            force_remount: true,
            params: RouteParams {
                phase: Some(phase),
                tier_number: snapshot.quiz.tier_number,
            },
        };
    }
    let target = if phase.is_completion() {
        Route::Default
    } else {
        Route::Prepare
    };
    NavigationDecision {
        target,
        force_remount: false,
        params: RouteParams::default(),
    }
}

/// Pure transition function: `(current route, snapshot) -> (navigation, effects)`.
pub fn reduce(current: Option<Route>, snapshot: &Snapshot) -> Reduction {
    let decision = decide(snapshot);
    let navigation = if decision.force_remount || current != Some(decision.target) {
        Some(decision)
    } else {
        None
    };
    let mut effects = Vec::new();
    if snapshot.player_active && snapshot.quiz.state.is_completion() {
        effects.push(Effect::RefetchPlayer);
    }
    Reduction {
        navigation,
        effects,
    }
}
