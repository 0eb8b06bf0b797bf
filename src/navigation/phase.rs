use serde::{Deserialize, Serialize};

/// Server-driven phase of a trivia round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizPhase {
    Idle,
    QuestionPre,
    QuestionOpen,
    QuestionClosed,
    QuestionComplete,
    BuyoutOpen,
    BuyoutComplete,
}

impl QuizPhase {
    pub const ALL: [QuizPhase; 7] = [
        QuizPhase::Idle,
        QuizPhase::QuestionPre,
        QuizPhase::QuestionOpen,
        QuizPhase::QuestionClosed,
        QuizPhase::QuestionComplete,
        QuizPhase::BuyoutOpen,
        QuizPhase::BuyoutComplete,
    ];

    /// Phases that end a round (or precede the first one). Entering one of
    /// these refreshes the player record.
    pub fn is_completion(self) -> bool {
        matches!(
            self,
            QuizPhase::Idle
                | QuizPhase::QuestionClosed
                | QuizPhase::QuestionComplete
                | QuizPhase::BuyoutComplete
        )
    }

    pub fn is_open(self) -> bool {
        matches!(self, QuizPhase::QuestionOpen | QuizPhase::BuyoutOpen)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuizPhase::Idle => "IDLE",
            QuizPhase::QuestionPre => "QUESTION_PRE",
            QuizPhase::QuestionOpen => "QUESTION_OPEN",
            QuizPhase::QuestionClosed => "QUESTION_CLOSED",
            QuizPhase::QuestionComplete => "QUESTION_COMPLETE",
            QuizPhase::BuyoutOpen => "BUYOUT_OPEN",
            QuizPhase::BuyoutComplete => "BUYOUT_COMPLETE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Default,
    Prepare,
    Question,
    Admin,
}

impl Route {
    /// Index passed along with a destructive reset.
    pub fn reset_index(self) -> usize {
        match self {
            Route::Default => 0,
            Route::Prepare => 1,
            Route::Question => 2,
            Route::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Route::Default => "Default",
            Route::Prepare => "Prepare",
            Route::Question => "Question",
            Route::Admin => "Admin",
        }
    }
}

/// Parameters a screen instance is mounted with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub phase: Option<QuizPhase>,
    pub tier_number: Option<u32>,
}

/// Quiz-phase feed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizState {
    pub state: QuizPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_number: Option<u32>,
}

/// Player feed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
    Reconnecting,
}

/// The inputs one evaluation sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub player_active: bool,
    pub quiz: QuizState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_state_wire_format() {
        let state: QuizState =
            serde_json::from_str(r#"{"state":"QUESTION_OPEN","tierNumber":3}"#).unwrap();
        assert_eq!(state.state, QuizPhase::QuestionOpen);
        assert_eq!(state.tier_number, Some(3));

        let idle: QuizState = serde_json::from_str(r#"{"state":"IDLE"}"#).unwrap();
        assert_eq!(idle.tier_number, None);
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        assert!(serde_json::from_str::<QuizState>(r#"{"state":"HALFTIME"}"#).is_err());
    }

    #[test]
    fn test_phase_classes() {
        let completion: Vec<_> = QuizPhase::ALL.into_iter().filter(|p| p.is_completion()).collect();
        assert_eq!(
            completion,
            vec![
                QuizPhase::Idle,
                QuizPhase::QuestionClosed,
                QuizPhase::QuestionComplete,
                QuizPhase::BuyoutComplete
            ]
        );
        assert!(QuizPhase::BuyoutOpen.is_open());
        assert!(!QuizPhase::QuestionPre.is_open());
        assert!(!QuizPhase::QuestionPre.is_completion());
    }

    #[test]
    fn test_phase_names_match_wire() {
        for phase in QuizPhase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.as_str()));
        }
    }
}
