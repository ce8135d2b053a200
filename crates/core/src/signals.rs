// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// Represents a digital signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DigitalLevel {
    #[default]
    Low,
    High,
}

impl DigitalLevel {
    pub fn is_high(self) -> bool {
        self == DigitalLevel::High
    }
}

impl From<bool> for DigitalLevel {
    fn from(b: bool) -> Self {
        if b {
            DigitalLevel::High
        } else {
            DigitalLevel::Low
        }
    }
}

impl From<DigitalLevel> for bool {
    fn from(level: DigitalLevel) -> Self {
        match level {
            DigitalLevel::High => true,
            DigitalLevel::Low => false,
        }
    }
}

/// Source side of an interrupt wire, as driven by a peripheral model.
#[derive(Debug, Clone, Default)]
pub struct InterruptLine {
    level: DigitalLevel,
}

impl InterruptLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&mut self) {
        self.level = DigitalLevel::High;
    }

    pub fn lower(&mut self) {
        self.level = DigitalLevel::Low;
    }

    pub fn level(&self) -> DigitalLevel {
        self.level
    }
}
