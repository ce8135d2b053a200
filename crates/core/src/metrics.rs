// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::arbitration::Winner;
use crate::ClicObserver;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
pub struct ArbitrationMetrics {
    tick_count: AtomicU64,
    edges_latched: AtomicU64,
    claims_cleared: AtomicU64,
    winner_changes_by_hart: Mutex<HashMap<usize, u64>>,
    start_time: Instant,
}

impl Default for ArbitrationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitrationMetrics {
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            edges_latched: AtomicU64::new(0),
            claims_cleared: AtomicU64::new(0),
            winner_changes_by_hart: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.tick_count.store(0, Ordering::SeqCst);
        self.edges_latched.store(0, Ordering::SeqCst);
        self.claims_cleared.store(0, Ordering::SeqCst);
        if let Ok(mut m) = self.winner_changes_by_hart.lock() {
            m.clear();
        }
    }

    pub fn get_ticks(&self) -> u64 {
        self.tick_count.load(Ordering::SeqCst)
    }

    pub fn get_edges_latched(&self) -> u64 {
        self.edges_latched.load(Ordering::SeqCst)
    }

    pub fn get_claims_cleared(&self) -> u64 {
        self.claims_cleared.load(Ordering::SeqCst)
    }

    pub fn get_winner_changes(&self, hart: usize) -> u64 {
        self.winner_changes_by_hart
            .lock()
            .ok()
            .and_then(|m| m.get(&hart).copied())
            .unwrap_or(0)
    }

    pub fn get_ticks_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_ticks() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl ClicObserver for ArbitrationMetrics {
    fn on_tick_end(&self, _tick: u64) {
        self.tick_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_edge_latched(&self, _line: usize) {
        self.edges_latched.fetch_add(1, Ordering::SeqCst);
    }

    fn on_claim_cleared(&self, _hart: usize, _line: usize) {
        self.claims_cleared.fetch_add(1, Ordering::SeqCst);
    }

    fn on_winner_changed(&self, hart: usize, _winner: Option<Winner>) {
        if let Ok(mut m) = self.winner_changes_by_hart.lock() {
            *m.entry(hart).or_insert(0) += 1;
        }
    }
}
