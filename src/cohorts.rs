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

//! Partition the AS population into disjoint, named cohorts.
//!
//! All cohorts but the last one are defined by an explicit predicate and evaluated in order, each
//! one only considering ASes that were not claimed by an earlier cohort. The last cohort is the
//! catch-all, receiving every AS that is left. The union of all cohorts is thus the full
//! population, and each AS is part of exactly one cohort.
use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    records::Asn,
    topology::{AsInfo, AsPopulation},
};

/// Error thrown when the cohorts cannot be computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    #[error("AS{0} has no connectivity score")]
    MissingScore(Asn),
    #[error("No cohorts configured")]
    NoCohorts,
    #[error("Cohort {0:?} is configured twice")]
    DuplicateCohort(String),
    #[error("The last cohort must be the only catch-all cohort, but {0:?} is not")]
    CatchAllNotLast(String),
}

/// Predicate selecting the members of a cohort among the unclaimed ASes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortSelector {
    /// The `k` ASes with the highest score (ties broken by the lower ASN).
    TopK(usize),
    /// All ASes with exactly this score.
    ScoreEquals(u64),
    /// All ASes with at least this score.
    ScoreAtLeast(u64),
    /// Everything not claimed by any earlier cohort.
    Remainder,
}

/// Configuration of a single cohort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CohortSpec {
    pub name: String,
    pub selector: CohortSelector,
    /// Lower bound on the number of adopters sampled in this cohort, at every percentage.
    #[serde(default)]
    pub min_adopters: usize,
}

impl CohortSpec {
    pub fn new(name: impl Into<String>, selector: CohortSelector) -> Self {
        Self {
            name: name.into(),
            selector,
            min_adopters: 0,
        }
    }

    pub fn with_min_adopters(mut self, min_adopters: usize) -> Self {
        self.min_adopters = min_adopters;
        self
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self.selector, CohortSelector::Remainder)
    }
}

/// Default cohorts: the 100 best connected ASes, the edge (no customers), and the rest.
///
/// The `edge` cohort always gets at least one adopter. Without it, the adopting metrics of the edge
/// cohort at 0% adoption would be undefined.
pub fn default_cohorts() -> Vec<CohortSpec> {
    vec![
        CohortSpec::new("high_connectivity", CohortSelector::TopK(100)),
        CohortSpec::new("edge", CohortSelector::ScoreEquals(0)).with_min_adopters(1),
        CohortSpec::new("remainder", CohortSelector::Remainder),
    ]
}

/// Check that the cohort specifications describe a valid partition.
pub fn validate_specs(specs: &[CohortSpec]) -> Result<(), PartitionError> {
    let Some(last) = specs.last() else {
        return Err(PartitionError::NoCohorts);
    };
    let mut names = HashSet::new();
    for spec in specs {
        if !names.insert(spec.name.as_str()) {
            return Err(PartitionError::DuplicateCohort(spec.name.clone()));
        }
    }
    if let Some(bad) = specs[..specs.len() - 1].iter().find(|s| s.is_catch_all()) {
        return Err(PartitionError::CatchAllNotLast(bad.name.clone()));
    }
    if !last.is_catch_all() {
        return Err(PartitionError::CatchAllNotLast(last.name.clone()));
    }
    Ok(())
}

/// A computed cohort. Members are sorted by ASN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    pub spec: CohortSpec,
    pub members: Vec<Asn>,
}

impl Cohort {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn contains(&self, asn: Asn) -> bool {
        self.members.binary_search(&asn).is_ok()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The result of the partitioner. Computed once per run.
#[derive(Debug, Clone)]
pub struct Partition {
    cohorts: Vec<Cohort>,
    membership: HashMap<Asn, usize>,
}

impl Partition {
    /// Partition the population according to the (ordered) cohort specifications.
    pub fn compute(
        population: &AsPopulation,
        specs: &[CohortSpec],
    ) -> Result<Self, PartitionError> {
        validate_specs(specs)?;

        // every AS needs a score, no matter which predicates are configured
        let ases: Vec<(Asn, u64)> = population
            .iter()
            .map(|AsInfo { asn, score }| {
                score
                    .map(|s| (*asn, s))
                    .ok_or(PartitionError::MissingScore(*asn))
            })
            .collect::<Result<_, _>>()?;

        let mut membership: HashMap<Asn, usize> = HashMap::with_capacity(ases.len());
        let mut cohorts = Vec::with_capacity(specs.len());

        for (idx, spec) in specs.iter().enumerate() {
            let unclaimed = ases.iter().filter(|(asn, _)| !membership.contains_key(asn));
            let mut members: Vec<Asn> = match spec.selector {
                CohortSelector::TopK(k) => unclaimed
                    .sorted_by(|(a1, s1), (a2, s2)| s2.cmp(s1).then(a1.cmp(a2)))
                    .take(k)
                    .map(|(asn, _)| *asn)
                    .collect(),
                CohortSelector::ScoreEquals(x) => unclaimed
                    .filter(|(_, s)| *s == x)
                    .map(|(asn, _)| *asn)
                    .collect(),
                CohortSelector::ScoreAtLeast(x) => unclaimed
                    .filter(|(_, s)| *s >= x)
                    .map(|(asn, _)| *asn)
                    .collect(),
                CohortSelector::Remainder => unclaimed.map(|(asn, _)| *asn).collect(),
            };
            members.sort_unstable();
            membership.extend(members.iter().map(|asn| (*asn, idx)));
            log::debug!("cohort {} has {} members", spec.name, members.len());
            cohorts.push(Cohort {
                spec: spec.clone(),
                members,
            });
        }

        debug_assert_eq!(membership.len(), population.len());
        debug_assert_eq!(
            cohorts.iter().map(Cohort::len).sum::<usize>(),
            population.len()
        );

        Ok(Self {
            cohorts,
            membership,
        })
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn get(&self, name: &str) -> Option<&Cohort> {
        self.cohorts.iter().find(|c| c.name() == name)
    }

    /// The cohort that contains the given AS.
    pub fn cohort_of(&self, asn: Asn) -> Option<&Cohort> {
        self.membership.get(&asn).map(|idx| &self.cohorts[*idx])
    }

    /// Total number of ASes over all cohorts.
    pub fn num_ases(&self) -> usize {
        self.membership.len()
    }
}

#[cfg(test)]
mod test {
    use rand::prelude::*;

    use super::*;
    use hijack_eval_utils::tables::AsRow;

    fn population() -> AsPopulation {
        AsPopulation::from_scores([(1, 50), (2, 0), (3, 7), (4, 50), (5, 0), (6, 3), (7, 100)])
            .unwrap()
    }

    #[test]
    fn default_style_partition() {
        let specs = vec![
            CohortSpec::new("top", CohortSelector::TopK(2)),
            CohortSpec::new("edge", CohortSelector::ScoreEquals(0)),
            CohortSpec::new("rest", CohortSelector::Remainder),
        ];
        let partition = Partition::compute(&population(), &specs).unwrap();
        // 1 and 4 tie at 50, the lower ASN wins
        assert_eq!(partition.get("top").unwrap().members, vec![1, 7]);
        assert_eq!(partition.get("edge").unwrap().members, vec![2, 5]);
        assert_eq!(partition.get("rest").unwrap().members, vec![3, 4, 6]);
        assert_eq!(partition.cohort_of(4).unwrap().name(), "rest");
        assert_eq!(partition.num_ases(), 7);
    }

    #[test]
    fn later_predicates_skip_claimed_ases() {
        let specs = vec![
            CohortSpec::new("big", CohortSelector::ScoreAtLeast(7)),
            CohortSpec::new("top", CohortSelector::TopK(1)),
            CohortSpec::new("rest", CohortSelector::Remainder),
        ];
        let partition = Partition::compute(&population(), &specs).unwrap();
        assert_eq!(partition.get("big").unwrap().members, vec![1, 3, 4, 7]);
        assert_eq!(partition.get("top").unwrap().members, vec![6]);
        assert_eq!(partition.get("rest").unwrap().members, vec![2, 5]);
    }

    #[test]
    fn missing_score_is_fatal() {
        let rows = vec![
            AsRow {
                asn: 1,
                score: Some(1),
            },
            AsRow { asn: 2, score: None },
        ];
        let population = AsPopulation::from_rows(&rows).unwrap();
        assert_eq!(
            Partition::compute(&population, &default_cohorts()).unwrap_err(),
            PartitionError::MissingScore(2)
        );
    }

    #[test]
    fn invalid_specs() {
        assert_eq!(validate_specs(&[]), Err(PartitionError::NoCohorts));
        assert_eq!(
            validate_specs(&[CohortSpec::new("top", CohortSelector::TopK(1))]),
            Err(PartitionError::CatchAllNotLast("top".to_string()))
        );
        assert_eq!(
            validate_specs(&[
                CohortSpec::new("a", CohortSelector::Remainder),
                CohortSpec::new("b", CohortSelector::Remainder),
            ]),
            Err(PartitionError::CatchAllNotLast("a".to_string()))
        );
        assert_eq!(
            validate_specs(&[
                CohortSpec::new("a", CohortSelector::TopK(1)),
                CohortSpec::new("a", CohortSelector::Remainder),
            ]),
            Err(PartitionError::DuplicateCohort("a".to_string()))
        );
        assert_eq!(validate_specs(&default_cohorts()), Ok(()));
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let n = rng.gen_range(0..300);
            let mut asns: Vec<Asn> = (1..2000).collect();
            asns.shuffle(&mut rng);
            let population = AsPopulation::from_scores(
                asns.into_iter()
                    .take(n)
                    .map(|asn| (asn, rng.gen_range(0..5u64) * rng.gen_range(0..20u64))),
            )
            .unwrap();
            let specs = vec![
                CohortSpec::new("top", CohortSelector::TopK(rng.gen_range(0..50))),
                CohortSpec::new("edge", CohortSelector::ScoreEquals(0)),
                CohortSpec::new("big", CohortSelector::ScoreAtLeast(rng.gen_range(0..40))),
                CohortSpec::new("rest", CohortSelector::Remainder),
            ];
            let partition = Partition::compute(&population, &specs).unwrap();

            let mut seen = HashSet::new();
            for cohort in partition.cohorts() {
                for asn in &cohort.members {
                    // pairwise disjoint
                    assert!(seen.insert(*asn));
                    assert_eq!(partition.cohort_of(*asn).unwrap().name(), cohort.name());
                }
            }
            // union is the full population
            assert_eq!(seen, population.asns().collect::<HashSet<_>>());
        }
    }
}
