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

//! Data-plane traceback: follow the `received_from` pointers of an AS until a terminal sentinel.
//!
//! The walk is iterative and bounded by [`MAX_HOPS`]. Exceeding the bound means that the forwarding
//! state contains a cycle, which is a fatal error: the whole chain of visited records is returned
//! for diagnosis.
use std::net::Ipv4Addr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    forwarding::ForwardingTable,
    records::{AdopterClass, Asn, ForwardingRecord, ReceivedFrom, TerminalCondition},
};

/// Maximum number of hops a traceback may take before it is considered a cycle.
pub const MAX_HOPS: usize = 64;

/// Error thrown when the forwarding state cannot be traced back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TracebackError {
    /// The chain did not reach a sentinel within [`MAX_HOPS`] hops.
    #[error(
        "Traceback from AS{start} exceeds {MAX_HOPS} hops (cycle in the forwarding state): {}",
        fmt_chain(.chain)
    )]
    HopLimitExceeded {
        start: Asn,
        chain: Vec<ForwardingRecord>,
    },
    /// The chain points to an AS without a route for the destination.
    #[error(
        "Traceback from AS{start} reaches AS{missing}, which has no route for {dst}: {}",
        fmt_chain(.chain)
    )]
    MissingRecord {
        start: Asn,
        missing: Asn,
        dst: Ipv4Addr,
        chain: Vec<ForwardingRecord>,
    },
}

fn fmt_chain(chain: &[ForwardingRecord]) -> String {
    chain.iter().map(|r| format!("[{r}]")).join(" -> ")
}

/// Outcome of tracing a single AS.
enum Walk {
    NoRoute,
    Terminal(TerminalCondition),
    Missing(Asn),
    Cycle,
}

/// Traceback over the forwarding table of a trial, towards a single destination address.
#[derive(Debug, Clone, Copy)]
pub struct Traceback<'a> {
    table: &'a ForwardingTable,
    dst: Ipv4Addr,
}

impl<'a> Traceback<'a> {
    pub fn new(table: &'a ForwardingTable, dst: Ipv4Addr) -> Self {
        Self { table, dst }
    }

    /// Trace the AS back to its terminal condition. Returns `Ok(None)` if the AS itself has no
    /// route for the destination.
    pub fn trace(&self, asn: Asn) -> Result<Option<TerminalCondition>, TracebackError> {
        match self.walk(asn, |_| ()) {
            Walk::NoRoute => Ok(None),
            Walk::Terminal(cond) => Ok(Some(cond)),
            Walk::Missing(missing) => Err(TracebackError::MissingRecord {
                start: asn,
                missing,
                dst: self.dst,
                chain: self.chain(asn),
            }),
            Walk::Cycle => Err(TracebackError::HopLimitExceeded {
                start: asn,
                chain: self.chain(asn),
            }),
        }
    }

    /// The (bounded) chain of records visited when tracing the AS.
    pub fn chain(&self, asn: Asn) -> Vec<ForwardingRecord> {
        let mut chain = Vec::new();
        self.walk(asn, |r| chain.push(*r));
        chain
    }

    fn walk<F: FnMut(&ForwardingRecord)>(&self, start: Asn, mut visit: F) -> Walk {
        let mut current = start;
        for hop in 0..MAX_HOPS {
            let Some(record) = self.table.route_for(current, self.dst) else {
                return if hop == 0 {
                    Walk::NoRoute
                } else {
                    Walk::Missing(current)
                };
            };
            visit(record);
            match record.received_from {
                ReceivedFrom::Terminal(cond) => return Walk::Terminal(cond),
                ReceivedFrom::Neighbor(next) => current = next,
            }
        }
        Walk::Cycle
    }
}

/// Number of traced ASes per (terminal condition, adopter class).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CountMatrix([[usize; 2]; 3]);

impl CountMatrix {
    pub fn add(&mut self, cond: TerminalCondition, class: AdopterClass) {
        self.0[cond.index()][class.index()] += 1;
    }

    pub fn get(&self, cond: TerminalCondition, class: AdopterClass) -> usize {
        self.0[cond.index()][class.index()]
    }

    /// Number of traced ASes of the given class.
    pub fn total_for(&self, class: AdopterClass) -> usize {
        self.0.iter().map(|row| row[class.index()]).sum()
    }

    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }
}

/// Result of classifying all observers of a cohort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub counts: CountMatrix,
    /// Observers that were traced to `HIJACKED`, in the order they were classified.
    pub hijacked: Vec<(Asn, AdopterClass)>,
    /// Observers without any route for the destination; they are not traced.
    pub untraced: Vec<(Asn, AdopterClass)>,
}

/// Trace every observer and bucket it by its terminal condition and adopter class.
pub fn classify(
    traceback: &Traceback<'_>,
    observers: impl IntoIterator<Item = (Asn, AdopterClass)>,
) -> Result<Classification, TracebackError> {
    let mut result = Classification::default();
    for (asn, class) in observers {
        match traceback.trace(asn)? {
            Some(cond) => {
                log::trace!("AS{asn} ({class}) is {cond}");
                result.counts.add(cond, class);
                if cond == TerminalCondition::Hijacked {
                    result.hijacked.push((asn, class));
                }
            }
            None => result.untraced.push((asn, class)),
        }
    }
    Ok(result)
}
