pub mod buffer;
pub mod display;
pub mod engine;
pub mod gesture;
pub mod layout;
pub mod popover;
pub mod timer;

pub use engine::{InputEvent, KeyboardInputEngine};
pub use layout::{GlyphSet, Key};
