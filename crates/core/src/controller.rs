// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::activation::{self, ActiveSet};
use crate::arbitration::{Arbiter, HartPort, Winner};
use crate::line::LineState;
use crate::signals::DigitalLevel;
use crate::snapshot::ClicSnapshot;
use crate::trigger::TriggerKind;
use crate::{ClicError, ClicObserver, ClicResult};
use labwired_clic_config::{ClaimPolicy, ClicConfig};
use std::path::Path;
use std::sync::Arc;

/// Core Local Interrupt Controller.
///
/// Owns `N` line records and `M` hart ports for its whole lifetime. Register
/// accessors take `&mut self`, so a write always lands between two ticks and
/// is first observed by the next [`Clic::tick`].
#[derive(Debug)]
pub struct Clic {
    config: ClicConfig,
    arbiter: Arbiter,
    lines: Vec<LineState>,
    inputs: Vec<DigitalLevel>,
    harts: Vec<HartPort>,
    active: ActiveSet,
    ticks: u64,
    pub observers: Vec<Arc<dyn ClicObserver>>,
}

impl Clic {
    pub fn new(config: ClicConfig) -> ClicResult<Self> {
        config
            .validate()
            .map_err(|e| ClicError::InvalidConfig(format!("{:#}", e)))?;

        let arbiter = Arbiter::new(config.max_priority(), config.threshold_policy);
        let lines = vec![LineState::new(); config.num_interrupts];
        let active = ActiveSet::capture(&lines);

        tracing::debug!(
            "CLIC: {} lines, {} harts, ipriolen={}, threshold {:?}, claim {:?}",
            config.num_interrupts,
            config.num_harts,
            config.ipriolen,
            arbiter.threshold_policy(),
            config.claim_policy
        );

        Ok(Self {
            arbiter,
            inputs: vec![DigitalLevel::Low; config.num_interrupts],
            harts: vec![HartPort::default(); config.num_harts],
            lines,
            active,
            ticks: 0,
            observers: Vec::new(),
            config,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let config = ClicConfig::from_file(path)?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &ClicConfig {
        &self.config
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn num_harts(&self) -> usize {
        self.harts.len()
    }

    /// Number of ticks evaluated since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ClicObserver>) {
        self.observers.push(observer);
    }

    fn check_line(&self, line: usize) -> ClicResult<()> {
        if line >= self.lines.len() {
            tracing::warn!("CLIC: access to line {} rejected", line);
            return Err(ClicError::LineOutOfRange {
                line,
                num_lines: self.lines.len(),
            });
        }
        Ok(())
    }

    fn check_hart(&self, hart: usize) -> ClicResult<()> {
        if hart >= self.harts.len() {
            tracing::warn!("CLIC: access to hart {} rejected", hart);
            return Err(ClicError::HartOutOfRange {
                hart,
                num_harts: self.harts.len(),
            });
        }
        Ok(())
    }

    // Line registers

    pub fn line(&self, line: usize) -> ClicResult<&LineState> {
        self.check_line(line)?;
        Ok(&self.lines[line])
    }

    pub fn lines(&self) -> &[LineState] {
        &self.lines
    }

    pub fn get_priority(&self, line: usize) -> ClicResult<u8> {
        Ok(self.line(line)?.priority)
    }

    /// Bits above the implemented priority width are dropped.
    pub fn set_priority(&mut self, line: usize, value: u8) -> ClicResult<()> {
        self.check_line(line)?;
        let masked = value & self.config.priority_mask();
        tracing::debug!("CLIC: cliciprio[{}] <- {:#x}", line, masked);
        self.lines[line].priority = masked;
        Ok(())
    }

    pub fn get_enabled(&self, line: usize) -> ClicResult<bool> {
        Ok(self.line(line)?.enabled)
    }

    pub fn set_enabled(&mut self, line: usize, enabled: bool) -> ClicResult<()> {
        self.check_line(line)?;
        tracing::debug!("CLIC: clicintie[{}] <- {}", line, enabled);
        self.lines[line].enabled = enabled;
        Ok(())
    }

    pub fn get_attributes(&self, line: usize) -> ClicResult<u8> {
        Ok(self.line(line)?.attributes)
    }

    /// Stores all eight bits; only bits [1:0] select the trigger kind.
    pub fn set_attributes(&mut self, line: usize, value: u8) -> ClicResult<()> {
        self.check_line(line)?;
        tracing::debug!(
            "CLIC: clicintattr[{}] <- {:#x} ({:?})",
            line,
            value,
            TriggerKind::from_attr(value)
        );
        self.lines[line].attributes = value;
        Ok(())
    }

    pub fn trigger_kind(&self, line: usize) -> ClicResult<TriggerKind> {
        Ok(self.line(line)?.trigger_kind())
    }

    pub fn set_trigger_kind(&mut self, line: usize, kind: TriggerKind) -> ClicResult<()> {
        let reserved = self.get_attributes(line)? & !0b11;
        self.set_attributes(line, reserved | kind.attr_bits())
    }

    /// Programs priority and attributes in one call and leaves the enable bit alone.
    pub fn configure(&mut self, line: usize, priority: u8, attributes: u8) -> ClicResult<()> {
        self.set_attributes(line, attributes)?;
        self.set_priority(line, priority)
    }

    pub fn get_pending(&self, line: usize) -> ClicResult<bool> {
        Ok(self.line(line)?.pending)
    }

    /// Acknowledges a latched edge. A no-op for level lines, whose pending bit
    /// is recomputed from the input every tick.
    pub fn clear_pending(&mut self, line: usize) -> ClicResult<()> {
        self.check_line(line)?;
        if self.lines[line].clear_pending() {
            tracing::debug!("CLIC: clicintip[{}] cleared", line);
        } else {
            tracing::trace!("CLIC: clear of level line {} ignored", line);
        }
        Ok(())
    }

    /// Software trigger for edge lines. A no-op for level lines.
    pub fn set_pending(&mut self, line: usize) -> ClicResult<()> {
        self.check_line(line)?;
        if self.lines[line].set_pending() {
            tracing::debug!("CLIC: clicintip[{}] set by software", line);
        } else {
            tracing::trace!("CLIC: set of level line {} ignored", line);
        }
        Ok(())
    }

    /// Pending and enabled, from the committed line state.
    pub fn is_active(&self, line: usize) -> ClicResult<bool> {
        Ok(activation::is_active(self.line(line)?))
    }

    // Input wires

    /// Drives the raw input of `line`. The level is sampled by the next tick.
    pub fn set_input(&mut self, line: usize, level: impl Into<DigitalLevel>) -> ClicResult<()> {
        self.check_line(line)?;
        self.inputs[line] = level.into();
        Ok(())
    }

    pub fn input(&self, line: usize) -> ClicResult<DigitalLevel> {
        self.check_line(line)?;
        Ok(self.inputs[line])
    }

    /// Drives inputs `0..levels.len()`; the remaining lines keep their level.
    pub fn drive_inputs(&mut self, levels: &[bool]) -> ClicResult<()> {
        if levels.len() > self.lines.len() {
            return Err(ClicError::LineOutOfRange {
                line: levels.len() - 1,
                num_lines: self.lines.len(),
            });
        }
        for (wire, &level) in self.inputs.iter_mut().zip(levels) {
            *wire = level.into();
        }
        Ok(())
    }

    // Hart ports

    pub fn hart(&self, hart: usize) -> ClicResult<&HartPort> {
        self.check_hart(hart)?;
        Ok(&self.harts[hart])
    }

    pub fn harts(&self) -> &[HartPort] {
        &self.harts
    }

    pub fn set_claim(&mut self, hart: usize, claim: bool) -> ClicResult<()> {
        self.check_hart(hart)?;
        self.harts[hart].claim = claim;
        Ok(())
    }

    pub fn claim(&self, hart: usize) -> ClicResult<bool> {
        Ok(self.hart(hart)?.claim)
    }

    pub fn set_threshold(&mut self, hart: usize, threshold: u8) -> ClicResult<()> {
        self.check_hart(hart)?;
        tracing::debug!("CLIC: mithreshold[{}] <- {:#x}", hart, threshold);
        self.harts[hart].threshold = threshold;
        Ok(())
    }

    pub fn threshold(&self, hart: usize) -> ClicResult<u8> {
        Ok(self.hart(hart)?.threshold)
    }

    pub fn winner(&self, hart: usize) -> ClicResult<Option<Winner>> {
        Ok(self.hart(hart)?.winner)
    }

    pub fn winner_active(&self, hart: usize) -> ClicResult<bool> {
        Ok(self.hart(hart)?.winner_active())
    }

    pub fn winner_id(&self, hart: usize) -> ClicResult<Option<usize>> {
        Ok(self.hart(hart)?.winner_id())
    }

    pub fn winner_priority(&self, hart: usize) -> ClicResult<Option<u8>> {
        Ok(self.hart(hart)?.winner_priority())
    }

    // Evaluation

    /// Advances the whole controller by one tick and returns the hart ports.
    ///
    /// Order within a tick:
    /// 1. asserted claims are applied according to the [`ClaimPolicy`],
    /// 2. every line's trigger engine samples its input, all from the state
    ///    committed at the start of the tick,
    /// 3. every hart arbitrates over the same `(active, priority)` snapshot.
    pub fn tick(&mut self) -> &[HartPort] {
        let tick = self.ticks;
        for observer in &self.observers {
            observer.on_tick_start(tick);
        }

        if self.config.claim_policy == ClaimPolicy::ClearEdgePending {
            self.apply_claims();
        }

        for (line, (state, input)) in self.lines.iter_mut().zip(self.inputs.iter()).enumerate() {
            let update = state.next(input.is_high());
            *state = update.next;
            if update.latched {
                tracing::debug!("CLIC: edge latched on line {}", line);
                for observer in &self.observers {
                    observer.on_edge_latched(line);
                }
            }
        }

        self.evaluate();

        self.ticks += 1;
        for observer in &self.observers {
            observer.on_tick_end(tick);
        }
        &self.harts
    }

    /// Drives `levels` onto the input wires and runs one tick.
    pub fn tick_with(&mut self, levels: &[bool]) -> ClicResult<&[HartPort]> {
        self.drive_inputs(levels)?;
        Ok(self.tick())
    }

    /// Re-runs arbitration over the committed line state without advancing
    /// the trigger engines.
    pub fn evaluate(&mut self) -> &[HartPort] {
        self.active.refresh(&self.lines);
        let changed = self.arbiter.arbitrate_all(&self.active, &mut self.harts);
        for hart in changed {
            let winner = self.harts[hart].winner;
            tracing::trace!("CLIC: hart {} winner {:?}", hart, winner);
            for observer in &self.observers {
                observer.on_winner_changed(hart, winner);
            }
        }
        &self.harts
    }

    fn apply_claims(&mut self) {
        for (hart, port) in self.harts.iter().enumerate() {
            let Some(winner) = port.winner.filter(|_| port.claim) else {
                continue;
            };
            let Some(line) = self.lines.get_mut(winner.line) else {
                continue;
            };
            if line.clear_pending() {
                tracing::debug!("CLIC: hart {} claimed line {}", hart, winner.line);
                for observer in &self.observers {
                    observer.on_claim_cleared(hart, winner.line);
                }
            }
        }
    }

    // Snapshots

    pub fn snapshot(&self) -> ClicSnapshot {
        ClicSnapshot {
            ticks: self.ticks,
            lines: self.lines.clone(),
            inputs: self.inputs.iter().map(|l| l.is_high()).collect(),
            harts: self.harts.clone(),
        }
    }

    /// Restores state captured from a controller with the same geometry.
    pub fn apply_snapshot(&mut self, snapshot: &ClicSnapshot) -> ClicResult<()> {
        if snapshot.lines.len() != self.lines.len() || snapshot.inputs.len() != self.lines.len() {
            return Err(ClicError::InvalidConfig(format!(
                "snapshot has {} lines, controller has {}",
                snapshot.lines.len(),
                self.lines.len()
            )));
        }
        if snapshot.harts.len() != self.harts.len() {
            return Err(ClicError::InvalidConfig(format!(
                "snapshot has {} harts, controller has {}",
                snapshot.harts.len(),
                self.harts.len()
            )));
        }

        for (hart, port) in snapshot.harts.iter().enumerate() {
            if let Some(winner) = port.winner {
                if winner.line >= self.lines.len() {
                    return Err(ClicError::InvalidConfig(format!(
                        "snapshot hart {} offers line {}, controller has {} lines",
                        hart,
                        winner.line,
                        self.lines.len()
                    )));
                }
            }
        }

        let mask = self.config.priority_mask();
        self.lines = snapshot
            .lines
            .iter()
            .map(|l| LineState {
                priority: l.priority & mask,
                ..*l
            })
            .collect();
        self.inputs = snapshot.inputs.iter().map(|&b| b.into()).collect();
        self.harts = snapshot.harts.clone();
        self.ticks = snapshot.ticks;
        self.active.refresh(&self.lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clic(lines: usize, harts: usize) -> Clic {
        Clic::new(ClicConfig::new(lines, harts, 8)).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(matches!(
            Clic::new(ClicConfig::new(0, 1, 8)),
            Err(ClicError::InvalidConfig(_))
        ));
        assert!(matches!(
            Clic::new(ClicConfig::new(4, 1, 12)),
            Err(ClicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_out_of_range_access() {
        let mut c = clic(4, 2);
        assert!(matches!(
            c.set_priority(4, 1),
            Err(ClicError::LineOutOfRange {
                line: 4,
                num_lines: 4
            })
        ));
        assert!(matches!(
            c.set_threshold(2, 0),
            Err(ClicError::HartOutOfRange {
                hart: 2,
                num_harts: 2
            })
        ));
        assert!(c.get_pending(100).is_err());
        assert!(c.winner(5).is_err());
        assert!(c.drive_inputs(&[false; 5]).is_err());
    }

    #[test]
    fn test_priority_is_masked() {
        let mut c = Clic::new(ClicConfig::new(2, 1, 3)).unwrap();
        c.set_priority(0, 0xFD).unwrap();
        assert_eq!(c.get_priority(0).unwrap(), 0b101);
    }

    #[test]
    fn test_attributes_keep_reserved_bits() {
        let mut c = clic(2, 1);
        c.set_attributes(1, 0xC1).unwrap();
        assert_eq!(c.get_attributes(1).unwrap(), 0xC1);
        assert_eq!(c.trigger_kind(1).unwrap(), TriggerKind::EdgeRising);

        c.set_trigger_kind(1, TriggerKind::LevelLow).unwrap();
        assert_eq!(c.get_attributes(1).unwrap(), 0xC2);
    }

    #[test]
    fn test_register_write_seen_at_next_tick() {
        let mut c = clic(2, 1);
        c.set_trigger_kind(0, TriggerKind::EdgeRising).unwrap();
        c.set_pending(0).unwrap();
        c.tick();
        assert_eq!(c.winner(0).unwrap(), None);

        c.set_enabled(0, true).unwrap();
        // Outputs are not recomputed until the next evaluation.
        assert_eq!(c.winner(0).unwrap(), None);
        c.tick();
        assert_eq!(c.winner_id(0).unwrap(), Some(0));
    }

    #[test]
    fn test_trigger_change_applies_from_next_tick() {
        let mut c = clic(1, 1);
        c.set_input(0, true).unwrap();
        c.tick(); // level high: pending follows input, prev_input = 1
        assert!(c.get_pending(0).unwrap());

        c.set_trigger_kind(0, TriggerKind::EdgeFalling).unwrap();
        c.set_input(0, false).unwrap();
        c.tick(); // falling edge under the new kind, pending stays latched
        assert!(c.get_pending(0).unwrap());

        c.clear_pending(0).unwrap();
        assert!(!c.get_pending(0).unwrap());
        c.tick();
        assert!(!c.get_pending(0).unwrap());
    }

    #[test]
    fn test_evaluate_does_not_advance() {
        let mut c = clic(2, 1);
        c.set_trigger_kind(1, TriggerKind::EdgeRising).unwrap();
        c.set_enabled(1, true).unwrap();
        c.set_pending(1).unwrap();
        c.evaluate();
        assert_eq!(c.ticks(), 0);
        assert_eq!(c.winner_id(0).unwrap(), Some(1));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut c = clic(3, 2);
        c.configure(2, 4, TriggerKind::EdgeRising.attr_bits()).unwrap();
        c.set_enabled(2, true).unwrap();
        c.set_threshold(1, 9).unwrap();
        c.tick_with(&[false, false, true]).unwrap();

        let snap = c.snapshot();
        let mut other = clic(3, 2);
        other.apply_snapshot(&snap).unwrap();
        assert_eq!(other.ticks(), 1);
        assert_eq!(other.lines(), c.lines());
        assert_eq!(other.harts(), c.harts());
        assert!(other.input(2).unwrap().is_high());

        let mut wrong = clic(4, 2);
        assert!(wrong.apply_snapshot(&snap).is_err());
    }

    #[test]
    fn test_snapshot_with_unknown_winner_rejected() {
        let config = ClicConfig {
            claim_policy: ClaimPolicy::ClearEdgePending,
            ..ClicConfig::new(2, 1, 8)
        };
        let mut c = Clic::new(config).unwrap();
        let mut snap = c.snapshot();
        snap.harts[0] = HartPort {
            claim: true,
            threshold: 0,
            winner: Some(Winner {
                line: 99,
                priority: 0,
            }),
        };

        assert!(matches!(
            c.apply_snapshot(&snap),
            Err(ClicError::InvalidConfig(_))
        ));
        // Rejected restore leaves the controller untouched and tickable.
        assert_eq!(c.winner(0).unwrap(), None);
        assert!(!c.claim(0).unwrap());
        c.tick();
        assert_eq!(c.ticks(), 1);
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join("labwired-clic-controller-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("clic.yaml");
        std::fs::write(
            &path,
            "schema_version: \"1.0\"\nnum_interrupts: 16\nnum_harts: 2\nipriolen: 4\n",
        )
        .unwrap();

        let c = Clic::from_file(&path).unwrap();
        assert_eq!(c.num_lines(), 16);
        assert_eq!(c.num_harts(), 2);
        assert_eq!(c.config().priority_mask(), 0x0F);

        std::fs::write(&path, "schema_version: \"1.0\"\nnum_interrupts: 0\n").unwrap();
        assert!(Clic::from_file(&path).is_err());
    }
}
