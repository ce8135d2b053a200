// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::line::LineState;

/// A line competes for arbitration when it is both pending and enabled.
#[inline]
pub fn is_active(line: &LineState) -> bool {
    line.pending && line.enabled
}

/// Read-only `(active, priority)` view of every line for one tick.
///
/// Built once per tick and shared by all harts.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    active: Vec<bool>,
    priority: Vec<u8>,
}

impl ActiveSet {
    pub fn capture(lines: &[LineState]) -> Self {
        let mut set = Self {
            active: Vec::with_capacity(lines.len()),
            priority: Vec::with_capacity(lines.len()),
        };
        set.refresh(lines);
        set
    }

    /// Rebuilds the view in place, reusing the existing allocations.
    pub fn refresh(&mut self, lines: &[LineState]) {
        self.active.clear();
        self.priority.clear();
        for line in lines {
            self.active.push(is_active(line));
            self.priority.push(line.priority);
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, line: usize) -> bool {
        self.active.get(line).copied().unwrap_or(false)
    }

    pub fn count_active(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    /// `(line, priority)` of every active line, in ascending line order.
    pub fn candidates(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.active
            .iter()
            .zip(self.priority.iter())
            .enumerate()
            .filter(|(_, (active, _))| **active)
            .map(|(line, (_, priority))| (line, *priority))
    }
}
