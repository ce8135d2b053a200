// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::signals::{DigitalLevel, InterruptLine};
use crate::{Clic, ClicResult};
use std::fmt::Debug;

/// Trait representing a generic interrupt controller as seen by the system
/// model: source wires on one side, a hart's acknowledge path on the other.
pub trait InterruptController: Debug + Send {
    /// Drive the raw input wire of an interrupt line.
    fn set_line_level(&mut self, irq: u32, level: DigitalLevel) -> ClicResult<()>;

    /// Check if a specific interrupt is enabled and pending.
    fn is_interrupt_active(&self, irq: u32) -> bool;

    /// Acknowledge the interrupt currently offered to `hart`, usually called
    /// by the CPU at the start of an ISR.
    fn acknowledge_interrupt(&mut self, hart: usize) -> Option<u32>;

    /// Complete an interrupt, usually called by the CPU after an ISR finishes.
    fn complete_interrupt(&mut self, hart: usize, irq: u32);
}

impl InterruptController for Clic {
    fn set_line_level(&mut self, irq: u32, level: DigitalLevel) -> ClicResult<()> {
        self.set_input(irq as usize, level)
    }

    fn is_interrupt_active(&self, irq: u32) -> bool {
        self.is_active(irq as usize).unwrap_or(false)
    }

    fn acknowledge_interrupt(&mut self, hart: usize) -> Option<u32> {
        let winner = self.winner(hart).ok().flatten()?;
        self.set_claim(hart, true).ok()?;
        Some(winner.line as u32)
    }

    fn complete_interrupt(&mut self, hart: usize, irq: u32) {
        if let Err(e) = self.clear_pending(irq as usize) {
            tracing::warn!("CLIC: complete of irq {} failed: {}", irq, e);
        }
        if let Err(e) = self.set_claim(hart, false) {
            tracing::warn!("CLIC: complete on hart {} failed: {}", hart, e);
        }
    }
}

/// A bridge that connects source-side `InterruptLine` signals to an
/// `InterruptController`.
pub struct InterruptBridge<'a> {
    controller: &'a mut dyn InterruptController,
}

impl<'a> InterruptBridge<'a> {
    pub fn new(controller: &'a mut dyn InterruptController) -> Self {
        Self { controller }
    }

    pub fn update(&mut self, irq: u32, line: &InterruptLine) -> ClicResult<()> {
        self.controller.set_line_level(irq, line.level())
    }

    /// Copies every source onto the controller input with the same index.
    pub fn update_all(&mut self, lines: &[InterruptLine]) -> ClicResult<()> {
        for (irq, line) in lines.iter().enumerate() {
            self.update(irq as u32, line)?;
        }
        Ok(())
    }
}
