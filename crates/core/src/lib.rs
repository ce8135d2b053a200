// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Behavioral model of a RISC-V Core Local Interrupt Controller (CLIC).
//!
//! Raw line inputs pass through a per-line trigger engine into latched pending
//! bits, are filtered by the enable bits, and are reduced once per tick into a
//! single winner per hart. [`Clic`] owns all of that state and exposes the
//! register-level contract; [`mmio`] maps it onto a byte-addressed window.

pub mod activation;
pub mod arbitration;
pub mod controller;
pub mod interrupt;
pub mod line;
pub mod metrics;
pub mod mmio;
pub mod signals;
pub mod snapshot;
pub mod trigger;


pub use arbitration::{Arbiter, HartPort, Winner};
pub use controller::Clic;
pub use labwired_clic_config::{ClaimPolicy, ClicConfig, ThresholdPolicy};
pub use line::LineState;
pub use trigger::TriggerKind;

#[derive(Debug, thiserror::Error)]
pub enum ClicError {
    #[error("Interrupt line {line} out of range (controller has {num_lines} lines)")]
    LineOutOfRange { line: usize, num_lines: usize },
    #[error("Hart {hart} out of range (controller has {num_harts} harts)")]
    HartOutOfRange { hart: usize, num_harts: usize },
    #[error("No CLIC register at offset {0:#x}")]
    UnmappedRegister(u64),
    #[error("Invalid CLIC configuration: {0}")]
    InvalidConfig(String),
}

pub type ClicResult<T> = Result<T, ClicError>;

#[derive(Debug, Clone, Default)]
pub struct PeripheralTickResult {
    pub irq: bool,
    pub cycles: u32,
    pub explicit_irqs: Vec<u32>,
}

/// Trait for observing controller events in a modular way.
pub trait ClicObserver: std::fmt::Debug + Send + Sync {
    fn on_tick_start(&self, _tick: u64) {}
    fn on_tick_end(&self, _tick: u64) {}
    fn on_edge_latched(&self, _line: usize) {}
    fn on_claim_cleared(&self, _hart: usize, _line: usize) {}
    fn on_winner_changed(&self, _hart: usize, _winner: Option<Winner>) {}
}

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> ClicResult<u8>;
    fn write(&mut self, offset: u64, value: u8) -> ClicResult<()>;
    fn tick(&mut self) -> PeripheralTickResult {
        PeripheralTickResult::default()
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn restore(&mut self, _state: serde_json::Value) -> ClicResult<()> {
        Ok(())
    }
}
