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

//! Library for the statistical evaluation of prefix-hijack defenses.
//!
//! The AS population is partitioned into cohorts, a percentage of every cohort adopts a defense
//! policy, and an external propagation engine computes the forwarding state of every AS. Tracing
//! that state back reveals which ASes are hijacked. Many randomized trials are aggregated into
//! means and confidence intervals per cohort, attack type, policy and adoption percentage.

pub mod adoption;
pub mod analyzer;
pub mod cohorts;
pub mod experiments;
pub mod forwarding;
pub mod records;
pub mod statistics;
pub mod topology;
pub mod util;

pub mod prelude {
    pub use super::{
        adoption::{AdoptionMap, CohortAdoption, RandomSource},
        analyzer::{analyze_cohort, TrialResult},
        cohorts::{default_cohorts, CohortSelector, CohortSpec, Partition},
        experiments::{
            AttackType, Policy, PropagationEngine, PropagationInput, RunConfig, Runner, Scenario,
            TrialContext, TrialKey,
        },
        forwarding::ForwardingTable,
        records::{AdopterClass, Asn, ForwardingRecord, ReceivedFrom, TerminalCondition},
        statistics::{AggregateKey, AggregateStatistic, Metric, MetricKind},
        topology::AsPopulation,
    };
}

#[cfg(test)]
mod test;
