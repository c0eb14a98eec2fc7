//! Session state owned by the worker loop.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::events::{CycleOutcome, CyclePhase, SessionSnapshot, StopReason};
use crate::hid::Hid;

/// Hard-stop limits checked before every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopLimits {
    pub max_no_progress: u32,
    pub inactivity_timeout: Duration,
}

/// Worker-private run state.
///
/// Other threads only ever see `SessionSnapshot` copies taken after a
/// cycle's outcome has been applied.
#[derive(Debug)]
pub struct SessionState {
    pub phase: CyclePhase,
    completed: HashSet<Hid>,
    no_progress: u32,
    last_progress: Instant,
    last_hid: Option<Hid>,
    pub cycles: u64,
    pub duplicates: u64,
    pub failed_cycles: u64,
    pub licenses_written: u64,
    pub licenses_failed: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: CyclePhase::Idle,
            completed: HashSet::new(),
            no_progress: 0,
            last_progress: Instant::now(),
            last_hid: None,
            cycles: 0,
            duplicates: 0,
            failed_cycles: 0,
            licenses_written: 0,
            licenses_failed: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of a run: clear the budgets.
    pub fn reset(&mut self) {
        self.no_progress = 0;
        self.last_progress = Instant::now();
    }

    /// Transition to a new phase. Returns the previous one.
    pub fn goto(&mut self, phase: CyclePhase) -> CyclePhase {
        tracing::trace!(from = %self.phase, to = %phase, "Phase transition");
        std::mem::replace(&mut self.phase, phase)
    }

    pub fn is_completed(&self, hid: &Hid) -> bool {
        self.completed.contains(hid)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn no_progress(&self) -> u32 {
        self.no_progress
    }

    pub fn since_progress(&self) -> Duration {
        self.last_progress.elapsed()
    }

    /// Fold a cycle outcome into the counters.
    pub fn apply(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Completed(hid) => {
                self.completed.insert(hid.clone());
                self.no_progress = 0;
                self.last_progress = Instant::now();
                self.last_hid = Some(hid.clone());
            }
            CycleOutcome::Duplicate(hid) => {
                self.duplicates += 1;
                self.last_hid = Some(hid.clone());
            }
            CycleOutcome::NoLicense(hid) | CycleOutcome::Incomplete { hid, .. } => {
                self.last_hid = Some(hid.clone());
            }
            CycleOutcome::Failed(_) => self.failed_cycles += 1,
        }
        if outcome.counts_as_no_progress() {
            self.no_progress += 1;
        }
    }

    /// Check the hard stops in priority order: user, retry limit, inactivity.
    pub fn check_hard_stop(&self, limits: &StopLimits, cancel: &CancelToken) -> Option<StopReason> {
        if cancel.is_cancelled() {
            return Some(StopReason::User);
        }
        if self.no_progress >= limits.max_no_progress {
            return Some(StopReason::RetryLimit {
                cycles: self.no_progress,
            });
        }
        let idle = self.since_progress();
        if idle > limits.inactivity_timeout {
            return Some(StopReason::InactivityTimeout { idle });
        }
        None
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            cycles: self.cycles,
            completed: self.completed.len(),
            duplicates: self.duplicates,
            failed_cycles: self.failed_cycles,
            licenses_written: self.licenses_written,
            licenses_failed: self.licenses_failed,
            no_progress: self.no_progress,
            since_progress: self.since_progress(),
            last_hid: self.last_hid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CycleFailure;
    use crate::protocol::ResponseError;

    fn limits() -> StopLimits {
        StopLimits {
            max_no_progress: 3,
            inactivity_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_retry_limit_after_max_no_progress() {
        let mut state = SessionState::new();
        let cancel = CancelToken::new();
        for _ in 0..2 {
            state.apply(&CycleOutcome::Failed(CycleFailure::Rejected(ResponseError::Reset)));
            assert_eq!(state.check_hard_stop(&limits(), &cancel), None);
        }
        state.apply(&CycleOutcome::Duplicate(Hid::new("AA")));
        assert_eq!(
            state.check_hard_stop(&limits(), &cancel),
            Some(StopReason::RetryLimit { cycles: 3 })
        );
    }

    #[test]
    fn test_success_resets_counter_and_marks_completed() {
        let mut state = SessionState::new();
        state.apply(&CycleOutcome::Failed(CycleFailure::Transport("x".into())));
        state.apply(&CycleOutcome::NoLicense(Hid::new("BB")));
        assert_eq!(state.no_progress(), 1);

        state.apply(&CycleOutcome::Completed(Hid::new("AA")));
        assert_eq!(state.no_progress(), 0);
        assert!(state.is_completed(&Hid::new("aa")));
        assert!(!state.is_completed(&Hid::new("BB")));

        let snap = state.snapshot();
        assert_eq!(snap.cycles, 3);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.failed_cycles, 1);
        assert_eq!(snap.last_hid, Some(Hid::new("AA")));
    }

    #[test]
    fn test_incomplete_is_not_completed() {
        let mut state = SessionState::new();
        state.apply(&CycleOutcome::Incomplete {
            hid: Hid::new("AA"),
            failed: 1,
        });
        assert!(!state.is_completed(&Hid::new("AA")));
        assert_eq!(state.no_progress(), 1);
    }

    #[test]
    fn test_duplicate_does_not_refresh_inactivity_timer() {
        let mut state = SessionState::new();
        state.apply(&CycleOutcome::Completed(Hid::new("AA")));
        std::thread::sleep(Duration::from_millis(30));

        let before = state.since_progress();
        state.apply(&CycleOutcome::Duplicate(Hid::new("AA")));
        assert!(state.since_progress() >= before);
        assert!(state.since_progress() >= Duration::from_millis(30));

        let limits = StopLimits {
            max_no_progress: 5,
            inactivity_timeout: Duration::from_millis(20),
        };
        assert!(matches!(
            state.check_hard_stop(&limits, &CancelToken::new()),
            Some(StopReason::InactivityTimeout { .. })
        ));
    }

    #[test]
    fn test_cancel_wins_over_other_stops() {
        let mut state = SessionState::new();
        for _ in 0..5 {
            state.apply(&CycleOutcome::Duplicate(Hid::new("AA")));
        }
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(state.check_hard_stop(&limits(), &cancel), Some(StopReason::User));
    }

    #[test]
    fn test_inactivity_timeout() {
        let state = SessionState::new();
        let limits = StopLimits {
            max_no_progress: 5,
            inactivity_timeout: Duration::ZERO,
        };
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            state.check_hard_stop(&limits, &CancelToken::new()),
            Some(StopReason::InactivityTimeout { .. })
        ));
    }
}
