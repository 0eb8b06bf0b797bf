// Controller layer for the live trivia client: the on-screen keyboard
// (buffer, gestures, alternate-glyph popover) and the quiz-phase navigation
// reducer. The terminal harness in main.rs drives both through this crate.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod keyboard;
pub mod navigation;
pub mod ui;
