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

//! Control-plane statistics, computed only from each AS's own records (no traceback).
use serde::{Deserialize, Serialize};

use crate::{
    experiments::scenarios::Scenario,
    forwarding::ForwardingTable,
    records::{AdopterClass, Asn, PerClass, ReceivedFrom, TerminalCondition},
};

/// What an AS's own RIB reveals about the attack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlPlaneView {
    /// The AS holds no record at all.
    pub no_rib: bool,
    /// Some record carries the attacker's (prefix, origin) pair.
    pub received_attacker: bool,
    /// Some record carries the victim's pair.
    pub received_victim: bool,
    /// Some record is a blackhole.
    pub blackholed: bool,
}

/// Control-plane counters of a single adopter class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControlPlaneCounts {
    /// ASes that received the attacker's announcement.
    pub received_attacker: usize,
    /// ASes that received the victim's announcement, but not the attacker's.
    pub victim_only: usize,
    /// ASes with a direct blackhole record.
    pub blackholed: usize,
    /// ASes pruned from the propagation output entirely.
    pub no_rib: usize,
}

impl ControlPlaneCounts {
    fn add(&mut self, view: &ControlPlaneView) {
        if view.no_rib {
            self.no_rib += 1;
            return;
        }
        if view.received_attacker {
            self.received_attacker += 1;
        } else if view.received_victim {
            self.victim_only += 1;
        }
        if view.blackholed {
            self.blackholed += 1;
        }
    }
}

/// Direct lookups on the forwarding table of a trial.
#[derive(Debug, Clone, Copy)]
pub struct ControlPlaneCounter<'a> {
    table: &'a ForwardingTable,
    scenario: &'a Scenario,
}

impl<'a> ControlPlaneCounter<'a> {
    pub fn new(table: &'a ForwardingTable, scenario: &'a Scenario) -> Self {
        Self { table, scenario }
    }

    pub fn view(&self, asn: Asn) -> ControlPlaneView {
        let records = self.table.records(asn);
        let mut view = ControlPlaneView {
            no_rib: records.is_empty(),
            ..Default::default()
        };
        for r in records {
            view.received_attacker |= self.scenario.is_attacker_pair(&r.prefix, r.origin);
            view.received_victim |= self.scenario.is_victim_pair(&r.prefix, r.origin);
            view.blackholed |=
                r.received_from == ReceivedFrom::Terminal(TerminalCondition::Blackholed);
        }
        view
    }

    /// Count all observers, per adopter class.
    pub fn count(
        &self,
        observers: impl IntoIterator<Item = (Asn, AdopterClass)>,
    ) -> PerClass<ControlPlaneCounts> {
        let mut counts = PerClass::<ControlPlaneCounts>::default();
        for (asn, class) in observers {
            counts[class].add(&self.view(asn));
        }
        counts
    }
}
