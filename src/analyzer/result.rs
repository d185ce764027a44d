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

//! Describes the result of a single trial for a single cohort.

use serde::{Deserialize, Serialize};

use super::{control_plane::ControlPlaneCounts, traceback::CountMatrix};
use crate::{
    experiments::context::TrialKey,
    records::{AdopterClass, PerClass, TerminalCondition},
};

/// Raw counters of one cohort in one trial. Created once by the analyzer and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrialResult {
    pub key: TrialKey,
    pub cohort: String,
    /// Number of observers (cohort members other than attacker and victim), per class.
    pub observers: PerClass<usize>,
    /// Traceback outcome per (terminal condition, adopter class).
    pub data_plane: CountMatrix,
    pub control_plane: PerClass<ControlPlaneCounts>,
    pub visible_hijacks: PerClass<usize>,
    pub hidden_hijacks: PerClass<usize>,
}

impl TrialResult {
    /// Number of observers that were traced, i.e., that hold a route for the destination.
    pub fn traced(&self, class: AdopterClass) -> usize {
        self.data_plane.total_for(class)
    }
}

impl std::fmt::Display for TrialResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {}/{} adopting hijacked, {}/{} collateral hijacked ({} hidden)",
            self.key,
            self.cohort,
            self.data_plane
                .get(TerminalCondition::Hijacked, AdopterClass::Adopting),
            self.observers.adopting,
            self.data_plane
                .get(TerminalCondition::Hijacked, AdopterClass::Collateral),
            self.observers.collateral,
            self.hidden_hijacks.total(),
        )
    }
}
