// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::trigger::TriggerKind;
use serde::{Deserialize, Serialize};

/// Configuration and dynamic state of one interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineState {
    /// Priority, already masked to the implemented width. Lower is more urgent.
    pub priority: u8,
    pub enabled: bool,
    pub pending: bool,
    /// Raw `clicintattr` byte. Only bits [1:0] are interpreted.
    pub attributes: u8,
    /// Input sampled on the previous tick.
    pub prev_input: bool,
}

/// Result of advancing one line by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineUpdate {
    pub next: LineState,
    /// An edge set a pending bit that was clear.
    pub latched: bool,
}

impl LineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::from_attr(self.attributes)
    }

    /// Computes the state after one tick with `input` sampled on the wire.
    ///
    /// Depends only on `(prev_input, input, trigger_kind)` and the current
    /// pending bit; no other line is involved.
    pub fn next(&self, input: bool) -> LineUpdate {
        let kind = self.trigger_kind();
        let pending = kind.next_pending(self.pending, self.prev_input, input);
        LineUpdate {
            next: LineState {
                pending,
                prev_input: input,
                ..*self
            },
            latched: kind.is_edge() && pending && !self.pending,
        }
    }

    /// Software acknowledgement. Only edge lines hold a latched bit to clear;
    /// level lines recompute pending from the input on the next tick.
    pub fn clear_pending(&mut self) -> bool {
        if self.trigger_kind().is_edge() {
            self.pending = false;
            true
        } else {
            false
        }
    }

    /// Software trigger, the counterpart of [`LineState::clear_pending`].
    pub fn set_pending(&mut self) -> bool {
        if self.trigger_kind().is_edge() {
            self.pending = true;
            true
        } else {
            false
        }
    }
}
