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

//! Module that analyzes the forwarding state of a single trial.
//!
//! For every cohort, the analyzer takes all observers (members except attacker and victim),
//! traces them back through the forwarding state, counts what their own records reveal on the
//! control plane, and splits the hijacked ones into visible and hidden hijacks.
use thiserror::Error;

use crate::{
    adoption::CohortAdoption,
    experiments::{context::TrialKey, scenarios::Scenario},
    forwarding::ForwardingTable,
    records::{AdopterClass, Asn, PerClass},
};

pub mod control_plane;
pub mod hijack_detector;
mod result;
pub mod traceback;

pub use control_plane::{ControlPlaneCounter, ControlPlaneCounts};
pub use hijack_detector::{DetectorError, HijackDetector, HijackVisibility};
pub use result::*;
pub use traceback::{classify, Classification, CountMatrix, Traceback, TracebackError, MAX_HOPS};

/// Fatal inconsistency in the forwarding state of a trial.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0}")]
    Traceback(#[from] TracebackError),
    #[error("{0}")]
    Detector(#[from] DetectorError),
    /// Every visible hijack requires the attacker's announcement in the AS's own RIB.
    #[error(
        "{key} {cohort}: {visible} visible hijacks of {class} ASes, but only {received_attacker} \
         of them received the attacker's announcement"
    )]
    ControlPlaneMismatch {
        key: TrialKey,
        cohort: String,
        class: AdopterClass,
        visible: usize,
        received_attacker: usize,
    },
}

/// Check that the control plane agrees with the traceback: no class can have more visible hijacks
/// than ASes that received the attacker's announcement.
pub fn cross_check(
    key: &TrialKey,
    cohort: &str,
    visibility: &HijackVisibility,
    control_plane: &PerClass<ControlPlaneCounts>,
) -> Result<(), AnalyzerError> {
    for class in AdopterClass::ALL {
        let visible = visibility.visible[class];
        let received_attacker = control_plane[class].received_attacker;
        if visible > received_attacker {
            return Err(AnalyzerError::ControlPlaneMismatch {
                key: key.clone(),
                cohort: cohort.to_string(),
                class,
                visible,
                received_attacker,
            });
        }
    }
    Ok(())
}

/// Observers of a cohort: all members except attacker and victim, with their adopter class.
pub fn observers<'a>(
    adoption: &'a CohortAdoption,
    scenario: &'a Scenario,
) -> impl Iterator<Item = (Asn, AdopterClass)> + 'a {
    adoption
        .iter()
        .filter(move |(asn, _)| !scenario.is_party(*asn))
}

/// Analyze the forwarding state of one trial for a single cohort.
pub fn analyze_cohort(
    key: &TrialKey,
    cohort: &str,
    adoption: &CohortAdoption,
    table: &ForwardingTable,
    scenario: &Scenario,
) -> Result<TrialResult, AnalyzerError> {
    let observers: Vec<(Asn, AdopterClass)> = observers(adoption, scenario).collect();
    let mut num_observers = PerClass::<usize>::default();
    for (_, class) in observers.iter() {
        num_observers[*class] += 1;
    }

    let traceback = Traceback::new(table, scenario.destination());
    let classification = classify(&traceback, observers.iter().copied())?;
    let control_plane = ControlPlaneCounter::new(table, scenario).count(observers.iter().copied());
    let visibility = HijackDetector::new(table, scenario).detect(&classification)?;
    cross_check(key, cohort, &visibility, &control_plane)?;

    if !classification.untraced.is_empty() {
        log::trace!(
            "{key} {cohort}: {} observers without a route for {}",
            classification.untraced.len(),
            scenario.destination()
        );
    }

    let result = TrialResult {
        key: key.clone(),
        cohort: cohort.to_string(),
        observers: num_observers,
        data_plane: classification.counts,
        control_plane,
        visible_hijacks: visibility.visible,
        hidden_hijacks: visibility.hidden,
    };
    log::trace!("{result}");
    Ok(result)
}
