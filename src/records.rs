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

//! Module defining the forwarding records produced by the external propagation engine.
use std::{
    fmt,
    ops::{Index, IndexMut, RangeInclusive},
};

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Number of an autonomous system.
pub type Asn = u32;

/// ASNs reserved for the terminal sentinels. No real AS may use one of those numbers.
pub const SENTINEL_RANGE: RangeInclusive<Asn> = 64512..=64514;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
/// Condition at which a traceback ends.
pub enum TerminalCondition {
    /// Traffic is dropped.
    Blackholed,
    /// Traffic reaches the attacker.
    Hijacked,
    /// Traffic reaches the legitimate origin.
    NotHijacked,
}

impl TerminalCondition {
    /// All conditions, ordered by their index.
    pub const ALL: [Self; 3] = [Self::Blackholed, Self::Hijacked, Self::NotHijacked];

    /// Reserved ASN written by the propagation engine in place of a neighbor.
    pub const fn sentinel(self) -> Asn {
        match self {
            Self::Blackholed => 64512,
            Self::Hijacked => 64513,
            Self::NotHijacked => 64514,
        }
    }

    /// Map a reserved ASN back to its condition.
    pub const fn from_sentinel(asn: Asn) -> Option<Self> {
        match asn {
            64512 => Some(Self::Blackholed),
            64513 => Some(Self::Hijacked),
            64514 => Some(Self::NotHijacked),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Blackholed => 0,
            Self::Hijacked => 1,
            Self::NotHijacked => 2,
        }
    }
}

/// Check whether an ASN lies in the reserved sentinel range.
pub fn is_reserved(asn: Asn) -> bool {
    SENTINEL_RANGE.contains(&asn)
}

/// Where an AS received its route from: either a neighbor, or the end of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ReceivedFrom {
    Neighbor(Asn),
    Terminal(TerminalCondition),
}

impl From<Asn> for ReceivedFrom {
    fn from(asn: Asn) -> Self {
        match TerminalCondition::from_sentinel(asn) {
            Some(cond) => Self::Terminal(cond),
            None => Self::Neighbor(asn),
        }
    }
}

impl From<ReceivedFrom> for Asn {
    fn from(value: ReceivedFrom) -> Self {
        match value {
            ReceivedFrom::Neighbor(asn) => asn,
            ReceivedFrom::Terminal(cond) => cond.sentinel(),
        }
    }
}

impl fmt::Display for ReceivedFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neighbor(asn) => write!(f, "AS{asn}"),
            Self::Terminal(cond) => write!(f, "{}", cond.to_string().to_uppercase()),
        }
    }
}

/// Forwarding decision of a single AS for a single prefix. Read-only input of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ForwardingRecord {
    pub asn: Asn,
    pub prefix: Ipv4Net,
    pub origin: Asn,
    pub received_from: ReceivedFrom,
}

impl fmt::Display for ForwardingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AS{} {} (origin AS{}) from {}",
            self.asn, self.prefix, self.origin, self.received_from
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
/// Whether an AS runs the evaluated policy in a trial.
pub enum AdopterClass {
    Adopting,
    Collateral,
}

impl AdopterClass {
    pub const ALL: [Self; 2] = [Self::Adopting, Self::Collateral];

    pub fn from_flag(is_adopter: bool) -> Self {
        if is_adopter {
            Self::Adopting
        } else {
            Self::Collateral
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Adopting => 0,
            Self::Collateral => 1,
        }
    }
}

/// One value for adopting and one value for non-adopting ASes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PerClass<T> {
    pub adopting: T,
    pub collateral: T,
}

impl<T> PerClass<T> {
    pub fn new(adopting: T, collateral: T) -> Self {
        Self {
            adopting,
            collateral,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AdopterClass, &T)> {
        [
            (AdopterClass::Adopting, &self.adopting),
            (AdopterClass::Collateral, &self.collateral),
        ]
        .into_iter()
    }
}

impl PerClass<usize> {
    pub fn total(&self) -> usize {
        self.adopting + self.collateral
    }
}

impl<T> Index<AdopterClass> for PerClass<T> {
    type Output = T;

    fn index(&self, class: AdopterClass) -> &T {
        match class {
            AdopterClass::Adopting => &self.adopting,
            AdopterClass::Collateral => &self.collateral,
        }
    }
}

impl<T> IndexMut<AdopterClass> for PerClass<T> {
    fn index_mut(&mut self, class: AdopterClass) -> &mut T {
        match class {
            AdopterClass::Adopting => &mut self.adopting,
            AdopterClass::Collateral => &mut self.collateral,
        }
    }
}
