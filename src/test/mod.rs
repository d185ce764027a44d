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

//! End-to-end tests of full runs, using propagation engines that replay hand-authored forwarding
//! state.
//!
//! Run them with
//!
//! ```shell
//! cargo test --release -- --nocapture --test-threads 1 --quiet
//! ```

use hijack_eval_utils::tables::ForwardingRow;

use crate::{
    experiments::scenarios::{SUBPREFIX, VICTIM_PREFIX},
    records::{Asn, TerminalCondition},
    statistics::{AggregateStatistic, Metric, MetricKind},
};

mod failures;
mod unannounced;

pub const HIJACKED: Asn = TerminalCondition::Hijacked.sentinel();
pub const NOT_HIJACKED: Asn = TerminalCondition::NotHijacked.sentinel();

/// Row for the victim's prefix, originated by AS99.
pub fn victim_row(asn: Asn, from: Asn) -> ForwardingRow {
    ForwardingRow {
        asn,
        prefix: VICTIM_PREFIX.to_string(),
        origin: 99,
        received_from_asn: from,
    }
}

/// Row for the sub-prefix, originated by AS666.
pub fn attacker_row(asn: Asn, from: Asn) -> ForwardingRow {
    ForwardingRow {
        asn,
        prefix: SUBPREFIX.to_string(),
        origin: 666,
        received_from_asn: from,
    }
}

/// Find the statistic of a (cohort, policy, percentage).
pub fn find<'a>(
    stats: &'a [AggregateStatistic],
    cohort: &str,
    policy: crate::experiments::Policy,
    percent: u8,
) -> &'a AggregateStatistic {
    stats
        .iter()
        .find(|s| s.key.cohort == cohort && s.key.policy == policy && s.key.percent == percent)
        .unwrap_or_else(|| panic!("no statistic for {cohort} {policy} {percent}%"))
}

/// Mean of a metric, or `None` if it was not requested.
pub fn mean(
    stat: &AggregateStatistic,
    kind: MetricKind,
    class: crate::records::AdopterClass,
) -> Option<f64> {
    stat.get(Metric::new(kind, class)).map(|s| s.mean)
}
