//! Key labels for the on-screen keyboard.
//!
//! Letters render as themselves; the few keys whose label differs from the
//! glyph they insert are mapped here so the view never matches on them.

use std::borrow::Cow;

use rust_i18n::t;

use crate::keyboard::layout::Key;

/// Label drawn on the backspace key.
pub const BACKSPACE_LABEL: &str = "⌫";

/// The hyphen key shows a true minus sign but inserts `-`.
pub const MINUS_LABEL: &str = "−";

pub fn key_label(key: Key, locale: &str) -> Cow<'static, str> {
    match key {
        Key::Backspace => Cow::Borrowed(BACKSPACE_LABEL),
        Key::Space => Cow::Owned(t!("keyboard.space", locale = locale).to_string()),
        Key::Punctuation('-') => Cow::Borrowed(MINUS_LABEL),
        Key::Char(ch) | Key::Punctuation(ch) => Cow::Owned(ch.to_string()),
    }
}

/// Relative width of a key in letter-key units.
pub fn key_width_units(key: Key) -> u16 {
    match key {
        Key::Space => 6,
        Key::Backspace => 2,
        _ => 1,
    }
}
