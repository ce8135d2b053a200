// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::activation::ActiveSet;
use labwired_clic_config::ThresholdPolicy;
use serde::{Deserialize, Serialize};

/// The line offered to a hart and the priority it won with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub line: usize,
    pub priority: u8,
}

/// Inputs and outputs of one hart context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HartPort {
    /// Driven by the core: it is servicing the offered winner.
    pub claim: bool,
    /// Driven by the core. Whether it filters candidates depends on the
    /// configured [`ThresholdPolicy`].
    pub threshold: u8,
    /// Result of the latest evaluation.
    pub winner: Option<Winner>,
}

impl HartPort {
    pub fn winner_active(&self) -> bool {
        self.winner.is_some()
    }

    pub fn winner_id(&self) -> Option<usize> {
        self.winner.map(|w| w.line)
    }

    pub fn winner_priority(&self) -> Option<u8> {
        self.winner.map(|w| w.priority)
    }
}

/// Per-hart priority reduction over an [`ActiveSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arbiter {
    max_priority: u8,
    threshold_policy: ThresholdPolicy,
}

impl Arbiter {
    /// `max_priority` is the all-ones value of the implemented priority width.
    pub fn new(max_priority: u8, threshold_policy: ThresholdPolicy) -> Self {
        Self {
            max_priority,
            threshold_policy,
        }
    }

    pub fn threshold_policy(&self) -> ThresholdPolicy {
        self.threshold_policy
    }

    /// Whether a line of `priority` may compete under `threshold`.
    #[inline]
    pub fn admits(&self, priority: u8, threshold: u8) -> bool {
        match self.threshold_policy {
            ThresholdPolicy::Ignore => true,
            ThresholdPolicy::PriorityAbove => priority > threshold,
            ThresholdPolicy::PriorityBelow => priority < threshold,
        }
    }

    /// Scans lines in ascending order keeping the first strictly better
    /// priority, so the lowest line id wins a tie.
    ///
    /// The running best starts at the all-ones priority and the comparison is
    /// strict, so a line at the all-ones priority is never offered.
    pub fn arbitrate(&self, active: &ActiveSet, threshold: u8) -> Option<Winner> {
        let mut best_priority = self.max_priority;
        let mut best_line = None;

        for (line, priority) in active.candidates() {
            if priority < best_priority && self.admits(priority, threshold) {
                best_priority = priority;
                best_line = Some(line);
            }
        }

        best_line.map(|line| Winner {
            line,
            priority: best_priority,
        })
    }

    /// Evaluates every hart against the same snapshot and stores the results
    /// in the ports. Returns the harts whose winner changed.
    pub fn arbitrate_all(&self, active: &ActiveSet, harts: &mut [HartPort]) -> Vec<usize> {
        let mut changed = Vec::new();
        for (hart, port) in harts.iter_mut().enumerate() {
            let winner = self.arbitrate(active, port.threshold);
            if winner != port.winner {
                changed.push(hart);
            }
            port.winner = winner;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineState;

    fn active_set(lines: &[(bool, u8)]) -> ActiveSet {
        let states: Vec<LineState> = lines
            .iter()
            .map(|&(active, priority)| LineState {
                pending: active,
                enabled: true,
                priority,
                ..LineState::new()
            })
            .collect();
        ActiveSet::capture(&states)
    }

    #[test]
    fn test_lowest_value_wins() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::Ignore);
        let set = active_set(&[(true, 5), (true, 2), (true, 9)]);
        assert_eq!(
            arb.arbitrate(&set, 0),
            Some(Winner {
                line: 1,
                priority: 2
            })
        );
    }

    #[test]
    fn test_tie_goes_to_lowest_id() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::Ignore);
        let set = active_set(&[(false, 1), (true, 3), (true, 3), (true, 3)]);
        assert_eq!(arb.arbitrate(&set, 0).map(|w| w.line), Some(1));
    }

    #[test]
    fn test_no_active_lines() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::Ignore);
        let set = active_set(&[(false, 0), (false, 0)]);
        assert_eq!(arb.arbitrate(&set, 0), None);
        assert_eq!(arb.arbitrate(&ActiveSet::default(), 0), None);
    }

    #[test]
    fn test_all_ones_priority_never_offered() {
        let arb = Arbiter::new(0x0F, ThresholdPolicy::Ignore);
        let set = active_set(&[(true, 0x0F), (true, 0x0F)]);
        assert_eq!(arb.arbitrate(&set, 0), None);

        let set = active_set(&[(true, 0x0F), (true, 0x0E)]);
        assert_eq!(arb.arbitrate(&set, 0).map(|w| w.line), Some(1));
    }

    #[test]
    fn test_threshold_ignored_by_default() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::Ignore);
        let set = active_set(&[(true, 10)]);
        assert!(arb.arbitrate(&set, 0).is_some());
        assert!(arb.arbitrate(&set, 200).is_some());
    }

    #[test]
    fn test_threshold_priority_above() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::PriorityAbove);
        let set = active_set(&[(true, 3), (true, 8)]);
        assert_eq!(arb.arbitrate(&set, 5).map(|w| w.line), Some(1));
        assert_eq!(arb.arbitrate(&set, 8), None);
        assert_eq!(arb.arbitrate(&set, 0).map(|w| w.line), Some(0));
    }

    #[test]
    fn test_threshold_priority_below() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::PriorityBelow);
        let set = active_set(&[(true, 3), (true, 8)]);
        assert_eq!(arb.arbitrate(&set, 5).map(|w| w.line), Some(0));
        assert_eq!(arb.arbitrate(&set, 3), None);
        assert_eq!(arb.arbitrate(&set, 0), None);
    }

    #[test]
    fn test_arbitrate_all_reports_changes() {
        let arb = Arbiter::new(0xFF, ThresholdPolicy::Ignore);
        let set = active_set(&[(true, 4)]);
        let mut harts = vec![HartPort::default(); 2];
        assert_eq!(arb.arbitrate_all(&set, &mut harts), vec![0, 1]);
        assert_eq!(harts[0].winner_id(), Some(0));
        assert_eq!(harts[1].winner_priority(), Some(4));
        assert!(arb.arbitrate_all(&set, &mut harts).is_empty());
    }
}
