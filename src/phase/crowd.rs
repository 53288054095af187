use super::StreakCounter;
use crate::Decision;

/// Bounded-trial streak policy for the crowd check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrowdPolicy {
    /// Consecutive GO frames needed to report GO.
    pub go_streak: u32,
    /// Frames scored before the phase falls back to STOP.
    pub frame_budget: u32,
}

impl Default for CrowdPolicy {
    fn default() -> Self {
        Self {
            go_streak: 10,
            frame_budget: 20,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrowdState {
    Continue,
    GoConfirmed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrowdOutcome {
    GoConfirmed,
    /// No qualifying GO run within the budget.
    StopByTimeout,
}

impl CrowdOutcome {
    /// Verdict to transmit.
    pub fn decision(self) -> Decision {
        match self {
            CrowdOutcome::GoConfirmed => Decision::Go,
            CrowdOutcome::StopByTimeout => Decision::Stop,
        }
    }
}

/// Debounces per-frame GO/STOP decisions within a frame budget.
#[derive(Debug)]
pub struct CrowdPhase {
    policy: CrowdPolicy,
    streak: StreakCounter,
    frames: u32,
    stops: u32,
}

impl CrowdPhase {
    pub fn new(policy: CrowdPolicy) -> Self {
        Self {
            policy,
            streak: StreakCounter::new(),
            frames: 0,
            stops: 0,
        }
    }

    pub fn observe(&mut self, decision: Decision) -> CrowdState {
        self.frames = self.frames.saturating_add(1);
        if decision == Decision::Stop {
            self.stops += 1;
        }
        if self.streak.record(decision == Decision::Go) >= self.policy.go_streak {
            CrowdState::GoConfirmed
        } else {
            CrowdState::Continue
        }
    }

    /// Spend one budget slot without a decision (frame not acquired).
    pub fn skip(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn exhausted(&self) -> bool {
        self.frames >= self.policy.frame_budget
    }

    /// Budget slots used so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn stops(&self) -> u32 {
        self.stops
    }

    pub fn streak(&self) -> u32 {
        self.streak.count()
    }

    /// Drive the phase from a lazy stream of per-frame decisions. `None`
    /// items are budget slots without a frame. Anything short of a full GO
    /// run is `StopByTimeout`.
    pub fn drive<I>(&mut self, decisions: I) -> CrowdOutcome
    where
        I: IntoIterator<Item = Option<Decision>>,
    {
        let remaining = self.policy.frame_budget.saturating_sub(self.frames) as usize;
        for decision in decisions.into_iter().take(remaining) {
            match decision {
                Some(decision) => {
                    if self.observe(decision) == CrowdState::GoConfirmed {
                        return CrowdOutcome::GoConfirmed;
                    }
                }
                None => self.skip(),
            }
        }
        CrowdOutcome::StopByTimeout
    }
}
