use std::collections::BTreeMap;
use std::time::Duration;

/// Identity of a scheduled timer, reported back when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Exclusive ownership token for a pending timer.
///
/// Not `Clone`: whoever holds the handle is the only party able to cancel it,
/// and cancelling consumes it. A fired timer's handle is stale; owners compare
/// it against the fired [`TimerId`] and drop it.
#[derive(Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
    deadline: Duration,
}

impl TimerHandle {
    pub fn is(&self, id: TimerId) -> bool {
        self.id == id
    }
}

/// Deadline-ordered timer queue on a caller-supplied clock.
///
/// Time is an offset from an arbitrary origin the owner chooses (the harness
/// uses `Instant` at startup, tests use literal durations). Cancellation
/// removes the entry, so a cancelled timer can never come back out of
/// [`TimerQueue::pop_due`].
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, deadline: Duration, payload: T) -> TimerHandle {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((deadline, id), payload);
        TimerHandle { id, deadline }
    }

    /// Cancels the timer behind `handle`. Returns the payload if the timer was
    /// still pending, `None` if it had already fired.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        self.pending.remove(&(handle.deadline, handle.id))
    }

    /// Removes and returns the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let (&(deadline, _), _) = self.pending.first_key_value()?;
        if deadline > now {
            return None;
        }
        self.pending
            .pop_first()
            .map(|((_, id), payload)| (id, payload))
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|&(deadline, _)| deadline)
    }

    pub fn is_pending(&self, handle: &TimerHandle) -> bool {
        self.pending.contains_key(&(handle.deadline, handle.id))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(1000), "clear");
        q.schedule(ms(400), "long");
        assert_eq!(q.next_deadline(), Some(ms(400)));

        assert!(q.pop_due(ms(399)).is_none());
        assert_eq!(q.pop_due(ms(1200)).map(|(_, p)| p), Some("long"));
        assert_eq!(q.pop_due(ms(1200)).map(|(_, p)| p), Some("clear"));
        assert!(q.pop_due(ms(5000)).is_none());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let h = q.schedule(ms(10), 1);
        assert_eq!(q.cancel(h), Some(1));
        assert!(q.pop_due(ms(100)).is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel_after_fire_is_none() {
        let mut q = TimerQueue::new();
        let h = q.schedule(ms(10), 1);
        let (id, _) = q.pop_due(ms(10)).unwrap();
        assert!(h.is(id));
        assert!(!q.is_pending(&h));
        assert_eq!(q.cancel(h), None);
    }

    #[test]
    fn test_same_deadline_keeps_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(5), 'a');
        q.schedule(ms(5), 'b');
        assert_eq!(q.pop_due(ms(5)).map(|(_, p)| p), Some('a'));
        assert_eq!(q.pop_due(ms(5)).map(|(_, p)| p), Some('b'));
    }
}
