use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::keyboard::layout::Key;
use crate::keyboard::timer::{TimerHandle, TimerQueue};

pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(400);
pub const DEFAULT_HOLD_TO_CLEAR: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureThresholds {
    pub long_press: Duration,
    pub hold_to_clear: Duration,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            long_press: DEFAULT_LONG_PRESS,
            hold_to_clear: DEFAULT_HOLD_TO_CLEAR,
        }
    }
}

/// Classification state of one pointer. Keys act as their own pointers, so
/// there is at most one gesture per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    /// Down, no threshold passed yet.
    Pressed,
    /// Long-press threshold passed on a key without alternates; release
    /// still counts as a tap.
    LongPressPending,
    /// Long-press opened the popover; the tap is suppressed for this press.
    LongPressActive,
    /// Hold-to-clear fired; the tap is suppressed for this press.
    HeldForClear,
}

/// What a press resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    Tap(Key),
    LongPress(Key),
    HoldToClear(Key),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GestureTimer {
    LongPress(Key),
    HoldToClear(Key),
}

#[derive(Debug)]
struct Gesture {
    state: GestureState,
    long_press: Option<TimerHandle>,
    hold_to_clear: Option<TimerHandle>,
}

/// Turns press/release pairs into taps, long-presses and hold-to-clear.
///
/// Each gesture owns the handles of the timers it armed. Every exit path
/// (release, cancel, teardown, a superseding threshold) cancels them through
/// the queue, so a timer that fires is always one whose gesture still wants it.
#[derive(Debug, Default)]
pub struct GestureTracker {
    thresholds: GestureThresholds,
    gestures: HashMap<Key, Gesture>,
    timers: TimerQueue<GestureTimer>,
}

impl GestureTracker {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            gestures: HashMap::new(),
            timers: TimerQueue::new(),
        }
    }

    pub fn state(&self, key: Key) -> GestureState {
        self.gestures
            .get(&key)
            .map(|g| g.state)
            .unwrap_or(GestureState::Idle)
    }

    /// Keys currently held down.
    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.gestures.keys().copied()
    }

    pub fn is_tracking(&self) -> bool {
        !self.gestures.is_empty()
    }

    /// Press-down. Returns false when the key is already down (auto-repeat).
    pub fn begin(&mut self, key: Key, now: Duration) -> bool {
        if self.gestures.contains_key(&key) {
            return false;
        }
        let long_press = self
            .timers
            .schedule(now + self.thresholds.long_press, GestureTimer::LongPress(key));
        let hold_to_clear = (key == Key::Backspace).then(|| {
            self.timers
                .schedule(now + self.thresholds.hold_to_clear, GestureTimer::HoldToClear(key))
        });
        self.gestures.insert(
            key,
            Gesture {
                state: GestureState::Pressed,
                long_press: Some(long_press),
                hold_to_clear,
            },
        );
        true
    }

    /// Release. Both timers are cancelled before the state is read.
    pub fn end(&mut self, key: Key) -> Option<GestureOutcome> {
        let gesture = self.gestures.remove(&key)?;
        let state = self.disarm(gesture);
        match state {
            GestureState::Pressed | GestureState::LongPressPending => Some(GestureOutcome::Tap(key)),
            GestureState::LongPressActive | GestureState::HeldForClear | GestureState::Idle => None,
        }
    }

    /// Drops the gesture on `key` without classifying it.
    pub fn cancel(&mut self, key: Key) {
        if let Some(gesture) = self.gestures.remove(&key) {
            self.disarm(gesture);
        }
    }

    pub fn cancel_all(&mut self) {
        let keys: Vec<Key> = self.gestures.keys().copied().collect();
        for key in keys {
            self.cancel(key);
        }
        debug_assert!(self.timers.is_empty());
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Fires the earliest timer due at `now`, if any. `has_alternates` decides
    /// whether a long-press opens the popover or degrades to a tap.
    ///
    /// Returns `Some(None)` when a timer fired without producing an outcome,
    /// `None` when nothing was due.
    pub fn fire_next(
        &mut self,
        now: Duration,
        has_alternates: impl Fn(Key) -> bool,
    ) -> Option<Option<GestureOutcome>> {
        let (id, timer) = self.timers.pop_due(now)?;
        let outcome = match timer {
            GestureTimer::LongPress(key) => {
                let Some(gesture) = self.gestures.get_mut(&key) else {
                    return Some(None);
                };
                if !gesture.long_press.as_ref().is_some_and(|h| h.is(id)) {
                    return Some(None);
                }
                gesture.long_press = None;
                if gesture.state != GestureState::Pressed {
                    return Some(None);
                }
                if has_alternates(key) {
                    debug!(?key, "long-press threshold reached, opening alternates");
                    gesture.state = GestureState::LongPressActive;
                    if let Some(handle) = gesture.hold_to_clear.take() {
                        self.timers.cancel(handle);
                    }
                    Some(GestureOutcome::LongPress(key))
                } else {
                    gesture.state = GestureState::LongPressPending;
                    None
                }
            }
            GestureTimer::HoldToClear(key) => {
                let Some(gesture) = self.gestures.get_mut(&key) else {
                    return Some(None);
                };
                if !gesture.hold_to_clear.as_ref().is_some_and(|h| h.is(id)) {
                    return Some(None);
                }
                gesture.hold_to_clear = None;
                if !matches!(
                    gesture.state,
                    GestureState::Pressed | GestureState::LongPressPending
                ) {
                    return Some(None);
                }
                debug!(?key, "hold-to-clear threshold reached");
                gesture.state = GestureState::HeldForClear;
                if let Some(handle) = gesture.long_press.take() {
                    self.timers.cancel(handle);
                }
                Some(GestureOutcome::HoldToClear(key))
            }
        };
        Some(outcome)
    }

    fn disarm(&mut self, mut gesture: Gesture) -> GestureState {
        if let Some(handle) = gesture.long_press.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = gesture.hold_to_clear.take() {
            self.timers.cancel(handle);
        }
        gesture.state
    }
}
