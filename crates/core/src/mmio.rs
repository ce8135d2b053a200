// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Byte-addressed register window of the CLIC.
//!
//! # Memory Map
//!
//! * `0x0000 + i`: `clicintip[i]`, pending. Write 0 clears, non-zero sets (edge lines only)
//! * `0x0400 + i`: `clicintie[i]`, enable (bit 0)
//! * `0x0800 + i`: `clicintattr[i]`, attributes
//! * `0x0C00 + i`: `cliciprio[i]`, priority
//! * `0x1000 + h * 0x1000`: per-hart block, see [`HART_THRESHOLD`] and friends
//!
//! The per-line windows reach lines `0..1024`. Larger controllers are fully
//! reachable through the [`Clic`] accessors.

use crate::snapshot::ClicSnapshot;
use crate::{Clic, ClicError, ClicResult, Peripheral, PeripheralTickResult};

pub const CLIC_INTIP_OFFSET: u64 = 0x000;
pub const CLIC_INTIE_OFFSET: u64 = 0x400;
pub const CLIC_INTATTR_OFFSET: u64 = 0x800;
pub const CLIC_INTPRIO_OFFSET: u64 = 0xC00;
pub const CLIC_HART_BASE: u64 = 0x1000;
pub const CLIC_HART_STRIDE: u64 = 0x1000;

/// Lines addressable through each per-line window.
pub const CLIC_LINE_WINDOW: u64 = 0x400;

/// `mithreshold`, read/write.
pub const HART_THRESHOLD: u64 = 0x0;
/// Read-only: bit 0 winner active, bit 1 claim.
pub const HART_STATUS: u64 = 0x1;
/// Read-only: winner id bits [7:0].
pub const HART_WINNER_ID_LO: u64 = 0x2;
/// Read-only: winner id bits [15:8].
pub const HART_WINNER_ID_HI: u64 = 0x3;
/// Read-only: winner priority.
pub const HART_WINNER_PRIORITY: u64 = 0x4;

const STATUS_WINNER_ACTIVE: u8 = 1 << 0;
const STATUS_CLAIM: u8 = 1 << 1;

/// A decoded register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    IntIp(usize),
    IntIe(usize),
    IntAttr(usize),
    IntPrio(usize),
    Threshold(usize),
    HartStatus(usize),
    WinnerIdLo(usize),
    WinnerIdHi(usize),
    WinnerPriority(usize),
}

impl Clic {
    /// Maps an offset onto a register, checking line and hart ranges.
    pub fn decode(&self, offset: u64) -> ClicResult<Register> {
        if offset < CLIC_HART_BASE {
            let line = (offset % CLIC_LINE_WINDOW) as usize;
            if line >= self.num_lines() {
                return Err(ClicError::LineOutOfRange {
                    line,
                    num_lines: self.num_lines(),
                });
            }
            return Ok(match offset / CLIC_LINE_WINDOW {
                0 => Register::IntIp(line),
                1 => Register::IntIe(line),
                2 => Register::IntAttr(line),
                _ => Register::IntPrio(line),
            });
        }

        let hart = ((offset - CLIC_HART_BASE) / CLIC_HART_STRIDE) as usize;
        if hart >= self.num_harts() {
            return Err(ClicError::HartOutOfRange {
                hart,
                num_harts: self.num_harts(),
            });
        }
        match (offset - CLIC_HART_BASE) % CLIC_HART_STRIDE {
            HART_THRESHOLD => Ok(Register::Threshold(hart)),
            HART_STATUS => Ok(Register::HartStatus(hart)),
            HART_WINNER_ID_LO => Ok(Register::WinnerIdLo(hart)),
            HART_WINNER_ID_HI => Ok(Register::WinnerIdHi(hart)),
            HART_WINNER_PRIORITY => Ok(Register::WinnerPriority(hart)),
            _ => Err(ClicError::UnmappedRegister(offset)),
        }
    }

    fn read_reg(&self, reg: Register) -> ClicResult<u8> {
        Ok(match reg {
            Register::IntIp(i) => self.get_pending(i)? as u8,
            Register::IntIe(i) => self.get_enabled(i)? as u8,
            Register::IntAttr(i) => self.get_attributes(i)?,
            Register::IntPrio(i) => self.get_priority(i)?,
            Register::Threshold(h) => self.threshold(h)?,
            Register::HartStatus(h) => {
                let port = self.hart(h)?;
                let mut status = 0;
                if port.winner_active() {
                    status |= STATUS_WINNER_ACTIVE;
                }
                if port.claim {
                    status |= STATUS_CLAIM;
                }
                status
            }
            Register::WinnerIdLo(h) => (self.winner_id(h)?.unwrap_or(0) & 0xFF) as u8,
            Register::WinnerIdHi(h) => ((self.winner_id(h)?.unwrap_or(0) >> 8) & 0xFF) as u8,
            Register::WinnerPriority(h) => self.winner_priority(h)?.unwrap_or(0),
        })
    }

    fn write_reg(&mut self, reg: Register, value: u8) -> ClicResult<()> {
        match reg {
            Register::IntIp(i) => {
                if value == 0 {
                    self.clear_pending(i)
                } else {
                    self.set_pending(i)
                }
            }
            Register::IntIe(i) => self.set_enabled(i, value & 1 != 0),
            Register::IntAttr(i) => self.set_attributes(i, value),
            Register::IntPrio(i) => self.set_priority(i, value),
            Register::Threshold(h) => self.set_threshold(h, value),
            Register::HartStatus(_)
            | Register::WinnerIdLo(_)
            | Register::WinnerIdHi(_)
            | Register::WinnerPriority(_) => {
                tracing::warn!("CLIC: write {:#x} to read-only {:?} ignored", value, reg);
                Ok(())
            }
        }
    }
}

impl Peripheral for Clic {
    fn read(&self, offset: u64) -> ClicResult<u8> {
        let reg = self.decode(offset)?;
        self.read_reg(reg)
    }

    fn write(&mut self, offset: u64, value: u8) -> ClicResult<()> {
        let reg = self.decode(offset)?;
        self.write_reg(reg, value)
    }

    /// `explicit_irqs` lists each offered line once, in ascending order, even
    /// when several harts share a winner.
    fn tick(&mut self) -> PeripheralTickResult {
        let harts = Clic::tick(self);
        let mut explicit_irqs: Vec<u32> = harts
            .iter()
            .filter_map(|p| p.winner_id())
            .map(|line| line as u32)
            .collect();
        explicit_irqs.sort_unstable();
        explicit_irqs.dedup();
        PeripheralTickResult {
            irq: !explicit_irqs.is_empty(),
            cycles: 1,
            explicit_irqs,
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(Clic::snapshot(self)).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> ClicResult<()> {
        let snapshot: ClicSnapshot = serde_json::from_value(state)
            .map_err(|e| ClicError::InvalidConfig(format!("bad CLIC snapshot: {}", e)))?;
        self.apply_snapshot(&snapshot)
    }
}
