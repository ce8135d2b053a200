// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::arbitration::HartPort;
use crate::line::LineState;
use serde::{Deserialize, Serialize};

/// Complete dynamic state of a [`crate::Clic`], for save/restore and for
/// JSON reporting. Configuration is not included; restore into a controller
/// built from the same config.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClicSnapshot {
    pub ticks: u64,
    pub lines: Vec<LineState>,
    /// Raw input levels as last driven.
    pub inputs: Vec<bool>,
    pub harts: Vec<HartPort>,
}

impl ClicSnapshot {
    /// Ids of every line whose pending bit is set.
    pub fn pending_lines(&self) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.pending)
            .map(|(i, _)| i)
            .collect()
    }
}
