// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use labwired_clic::metrics::ArbitrationMetrics;
use labwired_clic::snapshot::ClicSnapshot;
use labwired_clic::Clic;
use labwired_clic_config::{
    Expectation, LineSetup, PendingAssertion, StimulusScript, StimulusStep, WinnerAssertion,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExpectationResult {
    pub step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    pub tick: u64,
    pub expectation: Expectation,
    pub passed: bool,
    pub observed: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunReport {
    pub result_schema_version: String,
    pub status: String,
    pub steps_executed: usize,
    pub ticks: u64,
    pub edges_latched: u64,
    pub claims_cleared: u64,
    pub expectations: Vec<ExpectationResult>,
    pub final_state: ClicSnapshot,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.expectations.iter().all(|e| e.passed)
    }
}

fn apply_setup(clic: &mut Clic, setup: &LineSetup) -> Result<()> {
    if let Some(attributes) = setup.attributes {
        clic.set_attributes(setup.line, attributes)?;
    }
    if let Some(priority) = setup.priority {
        clic.set_priority(setup.line, priority)?;
    }
    if let Some(enabled) = setup.enabled {
        clic.set_enabled(setup.line, enabled)?;
    }
    Ok(())
}

fn apply_step(clic: &mut Clic, step: &StimulusStep) -> Result<()> {
    for w in &step.writes {
        apply_setup(clic, w)?;
    }
    for &line in &step.set_pending {
        clic.set_pending(line)?;
    }
    for &line in &step.clear_pending {
        clic.clear_pending(line)?;
    }
    for (&line, &level) in &step.inputs {
        clic.set_input(line, level)?;
    }
    for drive in &step.harts {
        if let Some(claim) = drive.claim {
            clic.set_claim(drive.hart, claim)?;
        }
        if let Some(threshold) = drive.threshold {
            clic.set_threshold(drive.hart, threshold)?;
        }
    }
    Ok(())
}

fn check(clic: &Clic, expectation: &Expectation) -> Result<(bool, serde_json::Value)> {
    match expectation {
        Expectation::Winner(WinnerAssertion { winner }) => {
            let observed = clic.winner(winner.hart)?;
            let line_ok = observed.map(|w| w.line) == winner.line;
            let priority_ok = match winner.priority {
                Some(p) => observed.map(|w| w.priority) == Some(p),
                None => true,
            };
            Ok((line_ok && priority_ok, serde_json::to_value(observed)?))
        }
        Expectation::Pending(PendingAssertion { pending }) => {
            let observed = clic.get_pending(pending.line)?;
            Ok((observed == pending.value, serde_json::Value::Bool(observed)))
        }
    }
}

/// Builds a controller from the script and plays every step against it.
pub fn run_script(script: &StimulusScript) -> Result<RunReport> {
    let mut clic = Clic::new(script.clic.clone()).context("Failed to build controller")?;
    let metrics = Arc::new(ArbitrationMetrics::new());
    clic.add_observer(metrics.clone());

    for setup in &script.lines {
        apply_setup(&mut clic, setup).context("Failed to apply line setup")?;
    }

    let mut results = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        apply_step(&mut clic, step).with_context(|| format!("Failed to apply steps[{}]", index))?;

        if step.ticks == 0 {
            clic.evaluate();
        }
        for _ in 0..step.ticks {
            clic.tick();
        }
        debug!(
            "Step {} done at tick {}: {:?}",
            index,
            clic.ticks(),
            clic.harts()
        );

        for expectation in &step.expect {
            let (passed, observed) = check(&clic, expectation)
                .with_context(|| format!("Failed to evaluate steps[{}] expectation", index))?;
            if !passed {
                warn!(
                    "Expectation failed at step {}: {:?}, observed {}",
                    index, expectation, observed
                );
            }
            results.push(ExpectationResult {
                step: index,
                step_name: step.name.clone(),
                tick: clic.ticks(),
                expectation: expectation.clone(),
                passed,
                observed,
            });
        }
    }

    let passed = results.iter().all(|r| r.passed);
    let final_state = clic.snapshot();
    info!(
        "Run finished: {} steps, {} ticks ({:.0} ticks/s), {}/{} expectations passed",
        script.steps.len(),
        clic.ticks(),
        metrics.get_ticks_per_second(),
        results.iter().filter(|r| r.passed).count(),
        results.len()
    );
    debug!("Lines still pending: {:?}", final_state.pending_lines());

    Ok(RunReport {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: if passed { "pass" } else { "fail" }.to_string(),
        steps_executed: script.steps.len(),
        ticks: clic.ticks(),
        edges_latched: metrics.get_edges_latched(),
        claims_cleared: metrics.get_claims_cleared(),
        expectations: results,
        final_state,
    })
}
