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

//! Split the hijacked observers into visible and hidden hijacks.
//!
//! A hijack is visible to an AS if its own route carries the attacker's announcement and was
//! received from a neighbor that also carries it. All other hijacked ASes only learn about the
//! hijack through the full traceback; they are hidden hijacks.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::traceback::Classification;
use crate::{
    experiments::scenarios::Scenario,
    forwarding::ForwardingTable,
    records::{AdopterClass, Asn, PerClass, ReceivedFrom, TerminalCondition},
};

/// Error thrown when the detector disagrees with the traceback classifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectorError {
    #[error(
        "Inconsistent hijack counts for {class} ASes: {visible} visible, but only {hijacked} \
         hijacked"
    )]
    NegativeHiddenHijacks {
        class: AdopterClass,
        hijacked: usize,
        visible: usize,
    },
    #[error("AS{0} is classified as hijacked, but has no route for the destination")]
    NoRoute(Asn),
}

/// Visible and hidden hijacks, per adopter class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HijackVisibility {
    pub visible: PerClass<usize>,
    pub hidden: PerClass<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct HijackDetector<'a> {
    table: &'a ForwardingTable,
    scenario: &'a Scenario,
}

impl<'a> HijackDetector<'a> {
    pub fn new(table: &'a ForwardingTable, scenario: &'a Scenario) -> Self {
        Self { table, scenario }
    }

    /// Check whether the hijack of `asn` is visible from its own route and its upstream neighbor.
    pub fn is_visible(&self, asn: Asn) -> Result<bool, DetectorError> {
        let record = self
            .table
            .route_for(asn, self.scenario.destination())
            .ok_or(DetectorError::NoRoute(asn))?;
        if !self.scenario.is_attacker_pair(&record.prefix, record.origin) {
            return Ok(false);
        }
        Ok(match record.received_from {
            ReceivedFrom::Terminal(cond) => cond == TerminalCondition::Hijacked,
            ReceivedFrom::Neighbor(upstream) => self
                .table
                .get(upstream)
                .and_then(|e| e.record_for(&record.prefix))
                .is_some_and(|r| self.scenario.is_attacker_pair(&r.prefix, r.origin)),
        })
    }

    /// Only ASes traced as hijacked are inspected, so the visible count can never exceed the
    /// hijacked count of a consistent classification.
    pub fn detect(
        &self,
        classification: &Classification,
    ) -> Result<HijackVisibility, DetectorError> {
        let mut visible = PerClass::<usize>::default();
        for (asn, class) in classification.hijacked.iter() {
            if self.is_visible(*asn)? {
                visible[*class] += 1;
            }
        }

        let mut hidden = PerClass::<usize>::default();
        for class in AdopterClass::ALL {
            let hijacked = classification
                .counts
                .get(TerminalCondition::Hijacked, class);
            hidden[class] = hijacked.checked_sub(visible[class]).ok_or(
                DetectorError::NegativeHiddenHijacks {
                    class,
                    hijacked,
                    visible: visible[class],
                },
            )?;
        }
        Ok(HijackVisibility { visible, hidden })
    }
}
