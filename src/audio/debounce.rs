use std::time::{Duration, Instant};

/// A single pending-task slot. Scheduling replaces whatever was pending, so only the
/// last value scheduled inside the quiet window ever comes out of `poll`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Returns true when an earlier pending value got cancelled.
    pub fn schedule(&mut self, value: T, now: Instant) -> bool {
        self.pending.replace((now + self.delay, value)).is_some()
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    /// Hands out the pending value once its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.deadline()?;
        if now >= due { self.cancel() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn only_the_last_value_fires() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(80 * MS);
        assert!(!d.schedule("p1", t0));
        assert!(d.schedule("p2", t0 + 20 * MS));
        assert!(d.schedule("p3", t0 + 40 * MS));
        assert_eq!(d.poll(t0 + 100 * MS), None); // window restarted at 40ms
        assert_eq!(d.poll(t0 + 120 * MS), Some("p3"));
        assert_eq!(d.poll(t0 + 500 * MS), None);
    }

    #[test]
    fn cancel_empties_the_slot() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(10 * MS);
        d.schedule(1, t0);
        assert_eq!(d.deadline(), Some(t0 + 10 * MS));
        assert_eq!(d.cancel(), Some(1));
        assert!(!d.is_pending());
        assert_eq!(d.poll(t0 + 50 * MS), None);
    }
}
