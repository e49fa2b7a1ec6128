//! Per-round penalty counting
//!
//! After each tally every active validator is charged exactly one outcome:
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | won every vote target | success |
//! | voted but missed a target | miss |
//! | cast no usable vote | abstain |

use oracle_core::types::VotePenaltyCounter;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Success,
    Miss,
    Abstain,
}

impl VoteOutcome {
    /// Classify a validator's round from its claim
    pub fn classify(win_count: i64, did_vote: bool, total_targets: usize) -> Self {
        if usize::try_from(win_count).is_ok_and(|wins| wins == total_targets) {
            Self::Success
        } else if did_vote {
            Self::Miss
        } else {
            Self::Abstain
        }
    }
}

/// Counter after charging one round outcome
pub fn record_outcome(counter: VotePenaltyCounter, outcome: VoteOutcome) -> VotePenaltyCounter {
    let mut next = counter;
    match outcome {
        VoteOutcome::Success => next.success_count = next.success_count.saturating_add(1),
        VoteOutcome::Miss => next.miss_count = next.miss_count.saturating_add(1),
        VoteOutcome::Abstain => next.abstain_count = next.abstain_count.saturating_add(1),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(VoteOutcome::classify(2, true, 2), VoteOutcome::Success);
        assert_eq!(VoteOutcome::classify(1, true, 2), VoteOutcome::Miss);
        assert_eq!(VoteOutcome::classify(0, false, 2), VoteOutcome::Abstain);
        assert_eq!(VoteOutcome::classify(0, true, 1), VoteOutcome::Miss);
    }

    #[test]
    fn test_no_targets_counts_as_success() {
        assert_eq!(VoteOutcome::classify(0, false, 0), VoteOutcome::Success);
    }

    #[test]
    fn test_record_outcome() {
        let counter = VotePenaltyCounter::default();
        let counter = record_outcome(counter, VoteOutcome::Miss);
        let counter = record_outcome(counter, VoteOutcome::Abstain);
        let counter = record_outcome(counter, VoteOutcome::Success);
        let counter = record_outcome(counter, VoteOutcome::Miss);
        assert_eq!(
            counter,
            VotePenaltyCounter {
                miss_count: 2,
                abstain_count: 1,
                success_count: 1
            }
        );
    }
}
