pub mod feed;
pub mod phase;
pub mod reducer;
pub mod resolver;
pub mod stack;

pub use phase::{ConnectionStatus, PlayerRecord, QuizPhase, QuizState, Route};
pub use resolver::{NavigationSurface, PlayerFeed, ScreenResolver};
