use std::time::Duration;

use tracing::debug;

use crate::keyboard::layout::Key;
use crate::keyboard::timer::{TimerHandle, TimerQueue};

pub const DEFAULT_FADE: Duration = Duration::from_millis(150);

/// Screen rectangle of the key a popover is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnchorRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// Layout query answering where a key is currently drawn.
pub trait AnchorMeasure {
    fn measure(&self, key: Key) -> Option<AnchorRect>;
}

/// Measurer for contexts without a layout; every anchor is the origin.
pub struct NoLayout;

impl AnchorMeasure for NoLayout {
    fn measure(&self, _key: Key) -> Option<AnchorRect> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopoverEvent {
    Opened(Key),
    Closed(Key),
}

#[derive(Debug)]
struct Fade {
    started: Duration,
    duration: Duration,
    from: f32,
    to: f32,
    handle: TimerHandle,
}

impl Fade {
    fn progress_at(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_sub(self.started).as_secs_f32();
        let t = (elapsed / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

/// A live popover, bound to exactly one anchor key.
#[derive(Debug)]
pub struct PopoverState {
    pub anchor: Key,
    pub anchor_rect: AnchorRect,
    pub alternatives: Vec<char>,
    visibility: Visibility,
    fade: Option<Fade>,
}

impl PopoverState {
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn fade_progress(&self, now: Duration) -> f32 {
        match (&self.fade, self.visibility) {
            (Some(fade), _) => fade.progress_at(now),
            (None, Visibility::Open) => 1.0,
            (None, _) => 0.0,
        }
    }
}

/// Alternate-glyph overlay with a cancellable fade in and out.
///
/// Only one transition timer exists at a time and it belongs to the current
/// state; reversing direction cancels it before the new one is scheduled.
#[derive(Debug)]
pub struct Popover {
    fade_duration: Duration,
    state: Option<PopoverState>,
    timers: TimerQueue<Visibility>,
}

impl Default for Popover {
    fn default() -> Self {
        Self::new(DEFAULT_FADE)
    }
}

impl Popover {
    pub fn new(fade_duration: Duration) -> Self {
        Self {
            fade_duration,
            state: None,
            timers: TimerQueue::new(),
        }
    }

    pub fn state(&self) -> Option<&PopoverState> {
        self.state.as_ref()
    }

    pub fn visibility(&self) -> Visibility {
        self.state
            .as_ref()
            .map(|s| s.visibility)
            .unwrap_or(Visibility::Closed)
    }

    pub fn anchor(&self) -> Option<Key> {
        self.state.as_ref().map(|s| s.anchor)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Starts the opening transition for `anchor`. Whatever popover was
    /// showing is force-completed first, with its transition cancelled.
    pub fn open(
        &mut self,
        anchor: Key,
        alternatives: &[char],
        measure: &dyn AnchorMeasure,
        now: Duration,
    ) {
        if let Some(previous) = self.close_now() {
            debug!(?previous, ?anchor, "force-completing popover for new anchor");
        }
        let anchor_rect = measure.measure(anchor).unwrap_or_else(|| {
            debug!(?anchor, "anchor not laid out, popover placed at origin");
            AnchorRect::default()
        });
        let fade = self.start_fade(now, 0.0, 1.0);
        self.state = Some(PopoverState {
            anchor,
            anchor_rect,
            alternatives: alternatives.to_vec(),
            visibility: Visibility::Opening,
            fade: Some(fade),
        });
    }

    /// Starts closing (tap outside, back action). An in-flight opening is
    /// cancelled and reversed from its current progress. Returns false if
    /// there was nothing to close.
    pub fn dismiss(&mut self, now: Duration) -> bool {
        let Some(visibility) = self.state.as_ref().map(|s| s.visibility) else {
            return false;
        };
        match visibility {
            Visibility::Opening | Visibility::Open => {
                self.begin_closing(now);
                true
            }
            Visibility::Closing | Visibility::Closed => false,
        }
    }

    /// Picks the alternate at `index` and starts closing. Selection is only
    /// accepted once fully open.
    pub fn select(&mut self, index: usize, now: Duration) -> Option<char> {
        let state = self.state.as_ref()?;
        if state.visibility != Visibility::Open {
            return None;
        }
        let glyph = state.alternatives.get(index).copied()?;
        self.begin_closing(now);
        Some(glyph)
    }

    /// Completes the transition due at `now`, if any.
    pub fn fire_next(&mut self, now: Duration) -> Option<Option<PopoverEvent>> {
        let (id, target) = self.timers.pop_due(now)?;
        let Some(state) = self.state.as_mut() else {
            return Some(None);
        };
        if !state.fade.as_ref().is_some_and(|f| f.handle.is(id)) {
            return Some(None);
        }
        state.fade = None;
        let event = match target {
            Visibility::Open => {
                state.visibility = Visibility::Open;
                Some(PopoverEvent::Opened(state.anchor))
            }
            _ => {
                let anchor = state.anchor;
                self.state = None;
                Some(PopoverEvent::Closed(anchor))
            }
        };
        Some(event)
    }

    /// Drops the popover immediately, cancelling any transition. Returns the
    /// anchor it was bound to.
    pub fn close_now(&mut self) -> Option<Key> {
        let mut state = self.state.take()?;
        if let Some(fade) = state.fade.take() {
            self.timers.cancel(fade.handle);
        }
        Some(state.anchor)
    }

    fn begin_closing(&mut self, now: Duration) {
        let progress = match self.state.as_mut().and_then(|s| s.fade.take()) {
            Some(fade) => {
                let progress = fade.progress_at(now);
                self.timers.cancel(fade.handle);
                progress
            }
            None => 1.0,
        };
        let fade = self.start_fade(now, progress, 0.0);
        if let Some(state) = self.state.as_mut() {
            state.visibility = Visibility::Closing;
            state.fade = Some(fade);
        }
    }

    /// Schedules a fade whose length is proportional to the distance covered.
    fn start_fade(&mut self, now: Duration, from: f32, to: f32) -> Fade {
        // Whole microseconds, so a full fade lasts exactly `fade_duration`.
        let distance = f64::from((to - from).abs());
        let micros = (self.fade_duration.as_micros() as f64 * distance).round() as u64;
        let duration = Duration::from_micros(micros);
        let target = if to > from {
            Visibility::Open
        } else {
            Visibility::Closed
        };
        let handle = self.timers.schedule(now + duration, target);
        Fade {
            started: now,
            duration,
            from,
            to,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLayout;

    impl AnchorMeasure for FixedLayout {
        fn measure(&self, _key: Key) -> Option<AnchorRect> {
            Some(AnchorRect {
                x: 10,
                y: 4,
                width: 5,
                height: 1,
            })
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn settle(p: &mut Popover, now: Duration) -> Vec<PopoverEvent> {
        let mut out = Vec::new();
        while let Some(ev) = p.fire_next(now) {
            out.extend(ev);
        }
        out
    }

    #[test]
    fn test_full_lifecycle() {
        let mut p = Popover::default();
        p.open(Key::Char('e'), &['é', 'è'], &FixedLayout, ms(0));
        assert_eq!(p.visibility(), Visibility::Opening);
        assert_eq!(p.state().unwrap().anchor_rect.x, 10);
        let half = p.state().unwrap().fade_progress(ms(75));
        assert!((half - 0.5).abs() < 0.01);

        assert_eq!(settle(&mut p, ms(150)), vec![PopoverEvent::Opened(Key::Char('e'))]);
        assert_eq!(p.visibility(), Visibility::Open);

        assert_eq!(p.select(1, ms(200)), Some('è'));
        assert_eq!(p.visibility(), Visibility::Closing);
        assert_eq!(settle(&mut p, ms(350)), vec![PopoverEvent::Closed(Key::Char('e'))]);
        assert_eq!(p.visibility(), Visibility::Closed);
        assert!(p.state().is_none());
    }

    #[test]
    fn test_select_rejected_mid_transition() {
        let mut p = Popover::default();
        p.open(Key::Char('e'), &['é'], &FixedLayout, ms(0));
        assert_eq!(p.select(0, ms(50)), None);
        settle(&mut p, ms(150));
        assert_eq!(p.select(5, ms(160)), None);
        assert_eq!(p.visibility(), Visibility::Open);
    }

    #[test]
    fn test_dismiss_during_opening_reverses_from_progress() {
        let mut p = Popover::default();
        p.open(Key::Char('a'), &['à'], &FixedLayout, ms(0));
        assert!(p.dismiss(ms(75)));
        assert_eq!(p.visibility(), Visibility::Closing);
        // Opening timer was cancelled: nothing opens at 150ms.
        assert!(settle(&mut p, ms(149)).is_empty());
        assert_eq!(settle(&mut p, ms(150)), vec![PopoverEvent::Closed(Key::Char('a'))]);
        assert!(!p.dismiss(ms(200)));
    }

    #[test]
    fn test_open_force_completes_closing() {
        let mut p = Popover::default();
        p.open(Key::Char('a'), &['à'], &FixedLayout, ms(0));
        settle(&mut p, ms(150));
        p.dismiss(ms(200));
        p.open(Key::Char('e'), &['é'], &FixedLayout, ms(210));
        assert_eq!(p.anchor(), Some(Key::Char('e')));
        assert_eq!(settle(&mut p, ms(400)), vec![PopoverEvent::Opened(Key::Char('e'))]);
        assert!(p.next_deadline().is_none());
    }

    #[test]
    fn test_fade_deadlines_are_exact() {
        let mut p = Popover::new(ms(150));
        p.open(Key::Char('e'), &['é'], &FixedLayout, ms(0));
        assert_eq!(p.next_deadline(), Some(ms(150)));
        assert_eq!(settle(&mut p, ms(150)), vec![PopoverEvent::Opened(Key::Char('e'))]);

        p.dismiss(ms(200));
        assert_eq!(p.next_deadline(), Some(ms(350)));

        let mut p = Popover::new(ms(150));
        p.open(Key::Char('e'), &['é'], &FixedLayout, ms(0));
        p.dismiss(ms(75));
        assert_eq!(p.next_deadline(), Some(ms(150)));
    }

    #[test]
    fn test_unmeasured_anchor_uses_origin() {
        let mut p = Popover::default();
        p.open(Key::Char('a'), &['à'], &NoLayout, ms(0));
        assert_eq!(p.state().unwrap().anchor_rect, AnchorRect::default());
    }

    #[test]
    fn test_close_now_cancels_transition() {
        let mut p = Popover::default();
        p.open(Key::Char('a'), &['à'], &FixedLayout, ms(0));
        assert_eq!(p.close_now(), Some(Key::Char('a')));
        assert!(p.next_deadline().is_none());
        assert!(settle(&mut p, ms(1000)).is_empty());
    }
}
