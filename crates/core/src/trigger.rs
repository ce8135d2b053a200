// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Interpreted bits of `clicintattr`. Bits [7:2] are reserved.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IntAttr: u8 {
        /// Edge triggered when set, level triggered otherwise.
        const EDGE = 1 << 0;
        /// Falling edge / active-low level when set.
        const NEGATIVE = 1 << 1;
    }
}

/// How a line's raw input is turned into a pending bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    #[default]
    LevelHigh,
    LevelLow,
    EdgeRising,
    EdgeFalling,
}

impl TriggerKind {
    /// Decodes bits [1:0] of an attribute byte. Every encoding maps to a kind.
    pub fn from_attr(attr: u8) -> Self {
        let bits = IntAttr::from_bits_truncate(attr);
        match (
            bits.contains(IntAttr::EDGE),
            bits.contains(IntAttr::NEGATIVE),
        ) {
            (false, false) => TriggerKind::LevelHigh,
            (false, true) => TriggerKind::LevelLow,
            (true, false) => TriggerKind::EdgeRising,
            (true, true) => TriggerKind::EdgeFalling,
        }
    }

    pub fn attr_bits(self) -> u8 {
        let bits = match self {
            TriggerKind::LevelHigh => IntAttr::empty(),
            TriggerKind::LevelLow => IntAttr::NEGATIVE,
            TriggerKind::EdgeRising => IntAttr::EDGE,
            TriggerKind::EdgeFalling => IntAttr::EDGE | IntAttr::NEGATIVE,
        };
        bits.bits()
    }

    pub fn is_edge(self) -> bool {
        matches!(self, TriggerKind::EdgeRising | TriggerKind::EdgeFalling)
    }

    /// Edge detection between the previous and current sample.
    /// Level kinds never report an edge.
    pub fn edge(self, prev_input: bool, input: bool) -> bool {
        match self {
            TriggerKind::EdgeRising => !prev_input && input,
            TriggerKind::EdgeFalling => prev_input && !input,
            TriggerKind::LevelHigh | TriggerKind::LevelLow => false,
        }
    }

    /// Next pending value. Edge kinds only ever set the bit; level kinds
    /// follow the input with the configured polarity.
    pub fn next_pending(self, pending: bool, prev_input: bool, input: bool) -> bool {
        match self {
            TriggerKind::EdgeRising | TriggerKind::EdgeFalling => {
                pending || self.edge(prev_input, input)
            }
            TriggerKind::LevelHigh => input,
            TriggerKind::LevelLow => !input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_decoding_is_total() {
        assert_eq!(TriggerKind::from_attr(0b00), TriggerKind::LevelHigh);
        assert_eq!(TriggerKind::from_attr(0b10), TriggerKind::LevelLow);
        assert_eq!(TriggerKind::from_attr(0b01), TriggerKind::EdgeRising);
        assert_eq!(TriggerKind::from_attr(0b11), TriggerKind::EdgeFalling);
    }

    #[test]
    fn test_reserved_bits_ignored() {
        assert_eq!(TriggerKind::from_attr(0xFC), TriggerKind::LevelHigh);
        assert_eq!(TriggerKind::from_attr(0xA5), TriggerKind::EdgeRising);
        assert_eq!(TriggerKind::from_attr(0x07), TriggerKind::EdgeFalling);
    }

    #[test]
    fn test_attr_bits_inverse() {
        for kind in [
            TriggerKind::LevelHigh,
            TriggerKind::LevelLow,
            TriggerKind::EdgeRising,
            TriggerKind::EdgeFalling,
        ] {
            assert_eq!(TriggerKind::from_attr(kind.attr_bits()), kind);
        }
    }

    #[test]
    fn test_edge_detection() {
        let r = TriggerKind::EdgeRising;
        assert!(r.edge(false, true));
        assert!(!r.edge(true, true));
        assert!(!r.edge(true, false));
        assert!(!r.edge(false, false));

        let f = TriggerKind::EdgeFalling;
        assert!(f.edge(true, false));
        assert!(!f.edge(false, true));

        assert!(!TriggerKind::LevelHigh.edge(false, true));
        assert!(!TriggerKind::LevelLow.edge(true, false));
    }

    #[test]
    fn test_next_pending() {
        let r = TriggerKind::EdgeRising;
        assert!(r.next_pending(false, false, true));
        // Set-only: a falling input does not clear.
        assert!(r.next_pending(true, true, false));
        assert!(!r.next_pending(false, true, true));

        assert!(TriggerKind::LevelHigh.next_pending(false, false, true));
        assert!(!TriggerKind::LevelHigh.next_pending(true, true, false));
        assert!(TriggerKind::LevelLow.next_pending(false, true, false));
        assert!(!TriggerKind::LevelLow.next_pending(true, false, true));
    }
}
