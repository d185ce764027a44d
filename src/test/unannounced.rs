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

//! An unannounced sub-prefix hijack against ROV: adopters drop the only announcement and are left
//! without any route. This is a valid outcome (nobody adopting is hijacked), not a gap.

use hijack_eval_utils::tables::ForwardingRow;

use super::*;
use crate::{
    cohorts::{CohortSelector, CohortSpec},
    experiments::{
        scenarios::{AttackType, Policy},
        EngineError, MemoryStore, PropagationEngine, PropagationInput, RunConfig, Runner,
    },
    records::AdopterClass,
    topology::AsPopulation,
};

/// AS1, AS2 and AS3 learn the sub-prefix directly from the attacker, unless they filter it.
struct UnannouncedEngine;

impl PropagationEngine for UnannouncedEngine {
    fn propagate(&self, input: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> {
        let mut rows = vec![attacker_row(666, HIJACKED)];
        for asn in [1, 2, 3] {
            if input.policy == Policy::Bgp || !input.adopters.contains(asn) {
                rows.push(attacker_row(asn, 666));
            }
        }
        Ok(rows)
    }
}

#[test]
fn adopters_without_a_route_are_not_hijacked() {
    let population =
        AsPopulation::from_scores([(1, 0), (2, 0), (3, 0), (99, 0), (666, 0)]).unwrap();
    let config = RunConfig {
        percentages: vec![0, 100],
        trials: 2,
        attack_types: vec![AttackType::UnannouncedSubprefixHijack],
        policies: vec![Policy::Rov],
        seed: Some(1),
        workers: Some(2),
        cohorts: vec![CohortSpec::new("all", CohortSelector::Remainder)],
        attacker_cohort: "all".to_string(),
        victim_cohort: "all".to_string(),
        attacker: Some(666),
        victim: Some(99),
    };
    let store = MemoryStore::new();
    let stats = Runner::new(config, &population, &store, &UnannouncedEngine)
        .unwrap()
        .with_run_id("unannounced")
        .run()
        .unwrap();
    assert_eq!(stats.len(), 2);

    use AdopterClass::*;
    use MetricKind::*;

    let none = find(&stats, "all", Policy::Rov, 0);
    assert_eq!(mean(none, DataPlaneHijacked, Collateral), Some(1.0));
    assert_eq!(mean(none, VisibleHijacks, Collateral), Some(1.0));
    assert_eq!(mean(none, DataPlaneHijacked, Adopting), None);

    let all = find(&stats, "all", Policy::Rov, 100);
    assert_eq!(mean(all, DataPlaneHijacked, Adopting), Some(0.0));
    assert_eq!(mean(all, DataPlaneNotHijacked, Adopting), Some(0.0));
    assert_eq!(mean(all, ControlPlaneHijacked, Adopting), Some(0.0));
    assert_eq!(mean(all, NoRib, Adopting), Some(1.0));
    assert_eq!(mean(all, DataPlaneHijacked, Collateral), None);
    let record = all.record();
    let title = AggregateStatistic::record_title();
    let col = title
        .iter()
        .position(|t| t == "data_plane_hijacked_adopting")
        .unwrap();
    assert_eq!(record[col], "0.000000");
}
