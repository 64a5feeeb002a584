use std::time::Duration;

use tokio::time::Instant;

/// Loading indicator shared by every in-flight operation on the page.
///
/// It stays visible while at least one holder is active. Each holder keeps it
/// up for at least the minimum duration from the moment it was first shown, so
/// fast responses do not flicker.
#[derive(Debug, Default)]
pub struct LoadingIndicator {
    holders: usize,
    shown_at: Option<Instant>,
}

impl LoadingIndicator {
    pub fn is_visible(&self) -> bool {
        self.holders > 0
    }

    pub fn holders(&self) -> usize {
        self.holders
    }

    pub fn show(&mut self) {
        if self.holders == 0 {
            self.shown_at = Some(Instant::now());
        }
        self.holders += 1;
    }

    /// Time still owed before a release may hide the indicator.
    pub fn remaining(&self, min: Duration) -> Duration {
        match self.shown_at {
            Some(at) => min.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    pub fn release(&mut self) {
        self.holders = self.holders.saturating_sub(1);
        if self.holders == 0 {
            self.shown_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_visible_until_last_holder_releases() {
        let mut indicator = LoadingIndicator::default();
        indicator.show();
        indicator.show();
        indicator.release();
        assert!(indicator.is_visible());
        indicator.release();
        assert!(!indicator.is_visible());
        indicator.release();
        assert_eq!(indicator.holders(), 0);
    }

    #[test]
    fn remaining_never_exceeds_minimum() {
        let mut indicator = LoadingIndicator::default();
        assert_eq!(indicator.remaining(Duration::from_millis(500)), Duration::ZERO);
        indicator.show();
        assert!(indicator.remaining(Duration::from_millis(500)) <= Duration::from_millis(500));
        assert_eq!(indicator.remaining(Duration::ZERO), Duration::ZERO);
    }
}
