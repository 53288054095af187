use super::StreakCounter;

/// Streak policy for confirming the door is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorPolicy {
    /// Consecutive "open" frames needed to confirm.
    pub open_streak: u32,
    /// Frame iterations allowed before the phase gives up.
    pub iteration_cap: u32,
}

impl Default for DoorPolicy {
    fn default() -> Self {
        Self {
            open_streak: 5,
            iteration_cap: 99_999,
        }
    }
}

/// Per-observation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorState {
    Continue,
    Confirmed,
}

/// Result of a whole door phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorOutcome {
    Confirmed,
    /// Cap exhausted, stream ended, or shutdown. The cycle is abandoned.
    NotConfirmed,
}

/// Debounces door-open classifications into a confirmation.
#[derive(Debug)]
pub struct DoorPhase {
    policy: DoorPolicy,
    streak: StreakCounter,
    iterations: u32,
}

impl DoorPhase {
    /// Enter the phase with a fresh streak.
    pub fn new(policy: DoorPolicy) -> Self {
        Self {
            policy,
            streak: StreakCounter::new(),
            iterations: 0,
        }
    }

    /// Feed one frame's classification.
    pub fn observe(&mut self, is_open: bool) -> DoorState {
        self.iterations = self.iterations.saturating_add(1);
        if self.streak.record(is_open) >= self.policy.open_streak {
            DoorState::Confirmed
        } else {
            DoorState::Continue
        }
    }

    /// Spend one iteration without an observation (frame not acquired).
    pub fn skip(&mut self) {
        self.iterations = self.iterations.saturating_add(1);
    }

    pub fn exhausted(&self) -> bool {
        self.iterations >= self.policy.iteration_cap
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn streak(&self) -> u32 {
        self.streak.count()
    }

    /// Drive the phase from a lazy stream of observations. `None` items are
    /// iterations without a usable frame. The stream is never pulled past
    /// the iteration cap; a stream that ends early is `NotConfirmed`.
    pub fn drive<I>(&mut self, observations: I) -> DoorOutcome
    where
        I: IntoIterator<Item = Option<bool>>,
    {
        let remaining = self.policy.iteration_cap.saturating_sub(self.iterations) as usize;
        for observation in observations.into_iter().take(remaining) {
            match observation {
                Some(is_open) => {
                    if self.observe(is_open) == DoorState::Confirmed {
                        return DoorOutcome::Confirmed;
                    }
                }
                None => self.skip(),
            }
        }
        DoorOutcome::NotConfirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(open_streak: u32, iteration_cap: u32) -> DoorPolicy {
        DoorPolicy {
            open_streak,
            iteration_cap,
        }
    }

    fn seq(bits: &[u8]) -> Vec<Option<bool>> {
        bits.iter().map(|b| Some(*b == 1)).collect()
    }

    #[test]
    fn interrupted_run_confirms_only_after_full_streak() {
        let mut phase = DoorPhase::new(policy(5, 9));
        let outcome = phase.drive(seq(&[1, 1, 1, 0, 1, 1, 1, 1, 1]));
        assert_eq!(outcome, DoorOutcome::Confirmed);
        assert_eq!(phase.iterations(), 9);
        assert_eq!(phase.streak(), 5);
    }

    #[test]
    fn observe_reports_confirmation_on_threshold_frame() {
        let mut phase = DoorPhase::new(policy(5, 100));
        for _ in 0..4 {
            assert_eq!(phase.observe(true), DoorState::Continue);
        }
        assert_eq!(phase.observe(true), DoorState::Confirmed);
    }

    #[test]
    fn cap_reached_before_streak_is_not_confirmed() {
        let mut phase = DoorPhase::new(policy(5, 8));
        let outcome = phase.drive(seq(&[1, 1, 1, 0, 1, 1, 1, 1, 1]));
        assert_eq!(outcome, DoorOutcome::NotConfirmed);
        assert_eq!(phase.iterations(), 8);
    }

    #[test]
    fn stream_is_not_pulled_past_cap() {
        let mut pulled = 0;
        let stream = std::iter::from_fn(|| {
            pulled += 1;
            Some(Some(false))
        });
        let mut phase = DoorPhase::new(policy(5, 7));
        assert_eq!(phase.drive(stream), DoorOutcome::NotConfirmed);
        assert_eq!(pulled, 7);
    }

    #[test]
    fn skipped_frames_use_cap_but_keep_streak() {
        let mut phase = DoorPhase::new(policy(3, 5));
        let outcome = phase.drive(vec![Some(true), None, Some(true), None, Some(true)]);
        assert_eq!(outcome, DoorOutcome::Confirmed);
        assert_eq!(phase.iterations(), 5);

        let mut phase = DoorPhase::new(policy(3, 4));
        let outcome = phase.drive(vec![Some(true), None, Some(true), None, Some(true)]);
        assert_eq!(outcome, DoorOutcome::NotConfirmed);
    }

    #[test]
    fn early_end_of_stream_is_not_confirmed() {
        let mut phase = DoorPhase::new(policy(5, 100));
        assert_eq!(phase.drive(seq(&[1, 1, 1])), DoorOutcome::NotConfirmed);
        assert!(!phase.exhausted());
    }

    #[test]
    fn confirmation_iff_some_run_reaches_threshold() {
        // Exhaustive over all 10-frame sequences.
        for mask in 0u32..(1 << 10) {
            let bits: Vec<Option<bool>> = (0..10).map(|i| Some((mask >> i) & 1 == 1)).collect();
            let mut longest = 0;
            let mut run = 0;
            for bit in &bits {
                run = if *bit == Some(true) { run + 1 } else { 0 };
                longest = longest.max(run);
            }
            let mut phase = DoorPhase::new(policy(4, 10));
            let confirmed = phase.drive(bits) == DoorOutcome::Confirmed;
            assert_eq!(confirmed, longest >= 4, "mask {:010b}", mask);
        }
    }
}
