/// Count of consecutive observations satisfying a predicate.
///
/// Owned by exactly one phase and recreated at phase entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreakCounter {
    count: u32,
}

impl StreakCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the streak on `hit`, reset it otherwise. Returns the new count.
    pub fn record(&mut self, hit: bool) -> u32 {
        if hit {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = 0;
        }
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reached(&self, threshold: u32) -> bool {
        self.count >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_resets_streak() {
        let mut streak = StreakCounter::new();
        assert_eq!(streak.record(true), 1);
        assert_eq!(streak.record(true), 2);
        assert_eq!(streak.record(false), 0);
        assert_eq!(streak.record(true), 1);
        assert!(streak.reached(1));
        assert!(!streak.reached(2));

        streak.reset();
        assert_eq!(streak.count(), 0);
    }
}
