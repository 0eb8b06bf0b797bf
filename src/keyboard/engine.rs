use std::time::Duration;

use tracing::{debug, trace};

use crate::keyboard::buffer::TextBuffer;
use crate::keyboard::gesture::{GestureOutcome, GestureState, GestureThresholds, GestureTracker};
use crate::keyboard::layout::{GlyphSet, Key};
use crate::keyboard::popover::{AnchorMeasure, NoLayout, Popover, PopoverEvent, Visibility};

/// Notifications for the owner of the engine, drained with
/// [`KeyboardInputEngine::take_events`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Fired after every buffer mutation with the new content.
    ValueChanged(String),
    /// A tap applied the key's primary action.
    KeyPressed(Key),
    /// A long-press opened the alternates for the key.
    LongPressed(Key),
    PopoverOpened(Key),
    PopoverClosed(Key),
}

/// The on-screen keyboard: buffer, gesture classification and the
/// alternate-glyph popover behind one input surface.
///
/// All time arguments are offsets on the owner's clock. Before handling a
/// press, release or selection the engine first fires every timer due at that
/// instant, so a late event loop never reorders a threshold and a release.
///
/// The gesture ends when the key is released, but the popover it opened
/// stays bound to its anchor until a selection, a dismissal or teardown.
pub struct KeyboardInputEngine {
    buffer: TextBuffer,
    glyphs: GlyphSet,
    gestures: GestureTracker,
    popover: Popover,
    measure: Box<dyn AnchorMeasure>,
    disabled: bool,
    events: Vec<InputEvent>,
}

impl KeyboardInputEngine {
    pub fn new(glyphs: GlyphSet, thresholds: GestureThresholds, fade: Duration) -> Self {
        Self {
            buffer: TextBuffer::default(),
            glyphs,
            gestures: GestureTracker::new(thresholds),
            popover: Popover::new(fade),
            measure: Box::new(NoLayout),
            disabled: false,
            events: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.buffer = TextBuffer::new(text);
        self
    }

    pub fn with_measure(mut self, measure: Box<dyn AnchorMeasure>) -> Self {
        self.measure = measure;
        self
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn glyphs(&self) -> &GlyphSet {
        &self.glyphs
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }

    pub fn popover_visibility(&self) -> Visibility {
        self.popover.visibility()
    }

    pub fn gesture_state(&self, key: Key) -> GestureState {
        self.gestures.state(key)
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.gestures.pressed_keys()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Disabling tears down in-flight gestures and the popover; every
    /// mutating call is then a silent no-op until re-enabled.
    pub fn set_disabled(&mut self, disabled: bool) {
        if disabled && !self.disabled {
            self.teardown();
        }
        self.disabled = disabled;
    }

    /// Cancels every outstanding timer, drops every gesture and closes the
    /// popover without a transition.
    pub fn teardown(&mut self) {
        self.gestures.cancel_all();
        if let Some(anchor) = self.popover.close_now() {
            self.events.push(InputEvent::PopoverClosed(anchor));
        }
    }

    pub fn take_events(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.gestures.next_deadline(), self.popover.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn insert_at_cursor(&mut self, ch: char) {
        if self.disabled {
            return;
        }
        self.buffer.insert(ch);
        self.value_changed();
    }

    pub fn delete_before_cursor(&mut self) {
        if self.disabled {
            return;
        }
        if self.buffer.delete_before_cursor() {
            self.value_changed();
        }
    }

    pub fn clear_all(&mut self) {
        if self.disabled {
            return;
        }
        if self.buffer.clear() {
            self.value_changed();
        }
    }

    /// Selection change reported by the text field.
    pub fn move_cursor_to(&mut self, pos: usize) {
        if self.disabled {
            return;
        }
        if let Err(err) = self.buffer.set_cursor(pos) {
            debug!(error = %err, "cursor clamped");
        }
    }

    /// Tap on the text field: the cursor jumps to the end.
    pub fn focus_field(&mut self) {
        if self.disabled {
            return;
        }
        self.buffer.move_to_end();
    }

    pub fn begin_press(&mut self, key: Key, now: Duration) {
        if self.disabled {
            return;
        }
        self.advance(now);
        // Any key press lands outside the popover.
        if self.popover.dismiss(now) {
            debug!(?key, "popover dismissed by press outside");
        }
        if !self.gestures.begin(key, now) {
            trace!(?key, "repeat press ignored");
        }
    }

    pub fn end_press(&mut self, key: Key, now: Duration) {
        if self.disabled {
            return;
        }
        self.advance(now);
        if let Some(outcome) = self.gestures.end(key) {
            self.apply(outcome, now);
        }
    }

    /// Picks the popover alternate at `index`. Accepted only while the
    /// popover is fully open; the glyph is inserted exactly once.
    pub fn resolve_alternate(&mut self, index: usize, now: Duration) -> Option<char> {
        if self.disabled {
            return None;
        }
        self.advance(now);
        let glyph = self.popover.select(index, now)?;
        debug!(%glyph, "alternate resolved");
        self.insert_at_cursor(glyph);
        Some(glyph)
    }

    /// System back action or a tap outside the keyboard.
    pub fn dismiss_popover(&mut self, now: Duration) -> bool {
        if self.disabled {
            return false;
        }
        self.advance(now);
        self.popover.dismiss(now)
    }

    /// Fires every gesture and popover timer due at or before `now`, in
    /// deadline order.
    pub fn advance(&mut self, now: Duration) {
        if self.disabled {
            return;
        }
        loop {
            let gesture_due = self.gestures.next_deadline().filter(|&d| d <= now);
            let popover_due = self.popover.next_deadline().filter(|&d| d <= now);
            match (gesture_due, popover_due) {
                (Some(g), Some(p)) if p < g => self.fire_popover(p),
                (Some(g), _) => self.fire_gesture(g),
                (None, Some(p)) => self.fire_popover(p),
                (None, None) => break,
            }
        }
    }

    fn fire_gesture(&mut self, at: Duration) {
        let glyphs = &self.glyphs;
        let fired = self
            .gestures
            .fire_next(at, |key| glyphs.alternates_for(key).is_some());
        if let Some(Some(outcome)) = fired {
            self.apply(outcome, at);
        }
    }

    fn fire_popover(&mut self, at: Duration) {
        match self.popover.fire_next(at) {
            Some(Some(PopoverEvent::Opened(key))) => self.events.push(InputEvent::PopoverOpened(key)),
            Some(Some(PopoverEvent::Closed(key))) => self.events.push(InputEvent::PopoverClosed(key)),
            _ => {}
        }
    }

    fn apply(&mut self, outcome: GestureOutcome, at: Duration) {
        match outcome {
            GestureOutcome::Tap(key) => {
                self.events.push(InputEvent::KeyPressed(key));
                match key.glyph() {
                    Some(ch) => self.insert_at_cursor(ch),
                    None => self.delete_before_cursor(),
                }
            }
            GestureOutcome::LongPress(key) => {
                let Some(alternatives) = self.glyphs.alternates_for(key).map(<[char]>::to_vec) else {
                    return;
                };
                if let Some(previous) = self.popover.close_now() {
                    self.events.push(InputEvent::PopoverClosed(previous));
                }
                self.events.push(InputEvent::LongPressed(key));
                self.popover
                    .open(key, &alternatives, self.measure.as_ref(), at);
            }
            GestureOutcome::HoldToClear(_) => self.clear_all(),
        }
    }

    fn value_changed(&mut self) {
        self.events
            .push(InputEvent::ValueChanged(self.buffer.value().to_string()));
    }
}
