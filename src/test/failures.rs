// HIJACK-EVAL: Statistical Evaluation of Prefix-Hijack Defenses on Simulated Forwarding State
// Copyright (C) 2024-2025 Roland Schmid <roschmi@ethz.ch> and Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Fatal conditions must abort the run and report everything needed to reproduce the failed trial.

use hijack_eval_utils::tables::ForwardingRow;

use super::*;
use crate::{
    analyzer::{AnalyzerError, TracebackError},
    cohorts::{CohortSelector, CohortSpec},
    experiments::{
        scenarios::{AttackType, Policy},
        EngineError, MemoryStore, PropagationEngine, PropagationInput, RecordStore, RunConfig,
        RunError, Runner, StoreError, TrialError,
    },
    forwarding::ForwardingError,
    topology::AsPopulation,
};

/// Forwarding state in which AS77 and AS88 point to each other whenever AS44 adopts.
struct CycleEngine;

impl PropagationEngine for CycleEngine {
    fn propagate(&self, input: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> {
        let mut rows = vec![
            victim_row(99, NOT_HIJACKED),
            attacker_row(666, HIJACKED),
            victim_row(44, 88),
        ];
        if input.adopters.contains(44) {
            rows.extend([victim_row(88, 77), victim_row(77, 88)]);
        } else {
            rows.extend([victim_row(88, 99), victim_row(77, 88)]);
        }
        Ok(rows)
    }
}

/// Writes a record for a sentinel ASN.
struct CollidingEngine;

impl PropagationEngine for CollidingEngine {
    fn propagate(&self, _: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> {
        Ok(vec![victim_row(99, NOT_HIJACKED), victim_row(HIJACKED, 99)])
    }
}

struct FailingEngine;

impl PropagationEngine for FailingEngine {
    fn propagate(&self, _: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> {
        Err(EngineError::Other("timeout".to_string()))
    }
}

fn population() -> AsPopulation {
    AsPopulation::from_scores([(77, 5), (88, 10), (44, 0), (99, 0), (666, 0)]).unwrap()
}

fn config(percentages: Vec<u8>) -> RunConfig {
    RunConfig {
        percentages,
        trials: 2,
        attack_types: vec![AttackType::SubprefixHijack],
        policies: vec![Policy::Rov],
        seed: Some(7),
        workers: Some(2),
        cohorts: vec![
            CohortSpec::new("transit", CohortSelector::TopK(1)),
            CohortSpec::new("edge", CohortSelector::ScoreEquals(0)),
            CohortSpec::new("remainder", CohortSelector::Remainder),
        ],
        attacker_cohort: "edge".to_string(),
        victim_cohort: "edge".to_string(),
        attacker: Some(666),
        victim: Some(99),
    }
}

#[test]
fn cycle_aborts_the_run() {
    let store = MemoryStore::new();
    // at 0% the forwarding state is fine, at 100% AS44 adopts and creates the cycle
    let runner = Runner::new(config(vec![0, 100]), &population(), &store, &CycleEngine)
        .unwrap()
        .with_run_id("cycle");
    let err = runner.run().unwrap_err();
    let RunError::Trial(failure) = err else {
        panic!("expected a trial failure, got {err}");
    };
    assert_eq!(failure.key.percent, 100);
    assert_eq!(failure.key.policy, Policy::Rov);
    assert_eq!(failure.seed, Some(7));
    assert_eq!(
        failure.scenario.as_ref().map(|s| (s.attacker(), s.victim())),
        Some((666, 99))
    );
    // the first cohort already contains AS88
    assert_eq!(failure.cohort.as_deref(), Some("transit"));
    assert!(matches!(
        failure.source,
        TrialError::Analyzer(AnalyzerError::Traceback(
            TracebackError::HopLimitExceeded { start: 88, .. }
        ))
    ));
    let msg = failure.to_string();
    assert!(msg.contains("seed 7"));
    assert!(msg.contains("namespace fwd_cycle_subprefix_hijack_rov_p100_t"));
    assert!(msg.contains(
        "[AS88 1.2.0.0/16 (origin AS99) from AS77] -> [AS77 1.2.0.0/16 (origin AS99) from AS88]"
    ));

    // the forwarding state of the failed trial is kept for inspection
    assert_eq!(store.read_records(&failure.namespace).unwrap().len(), 5);
}

#[test]
fn sentinel_collision_aborts_the_run() {
    let store = MemoryStore::new();
    let runner = Runner::new(config(vec![0]), &population(), &store, &CollidingEngine).unwrap();
    let err = runner.run().unwrap_err();
    let RunError::Trial(failure) = err else {
        panic!("expected a trial failure, got {err}");
    };
    assert!(matches!(
        failure.source,
        TrialError::Forwarding(ForwardingError::SentinelCollision { asn: HIJACKED, .. })
    ));
    assert_eq!(failure.cohort, None);
}

#[test]
fn engine_errors_abort_the_run() {
    let store = MemoryStore::new();
    let runner = Runner::new(config(vec![0]), &population(), &store, &FailingEngine).unwrap();
    assert!(matches!(
        runner.run(),
        Err(RunError::Trial(f)) if matches!(f.source, TrialError::Engine(EngineError::Other(_)))
    ));
}

#[test]
fn namespaces_are_never_reused() {
    let store = MemoryStore::new();
    let runner = Runner::new(config(vec![0]), &population(), &store, &CycleEngine)
        .unwrap()
        .with_run_id("twice");
    runner.run().unwrap();
    // the same run id derives the same namespaces
    let err = runner.run().unwrap_err();
    let RunError::Trial(failure) = err else {
        panic!("expected a trial failure, got {err}");
    };
    assert!(matches!(
        failure.source,
        TrialError::Store(StoreError::NamespaceCollision(_))
    ));
}

#[test]
fn invalid_configurations_are_rejected_before_any_trial() {
    let store = MemoryStore::new();
    let mut config = config(vec![0]);
    config.trials = 0;
    assert!(matches!(
        Runner::new(config, &population(), &store, &FailingEngine),
        Err(RunError::Config(_))
    ));

    let missing = AsPopulation::from_rows(&[hijack_eval_utils::tables::AsRow {
        asn: 1,
        score: None,
    }])
    .unwrap();
    assert!(matches!(
        Runner::new(RunConfig::default(), &missing, &store, &FailingEngine),
        Err(RunError::Partition(_))
    ));
}
