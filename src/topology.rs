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

//! The AS population of a run, together with the auxiliary ranking score of every AS.
use std::{
    collections::{hash_map::Entry, HashMap},
    path::Path,
};

use thiserror::Error;

use hijack_eval_utils::tables::{read_rows, AsRow};

use crate::records::{is_reserved, Asn};

/// Error thrown when the AS population cannot be loaded.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Cannot read the AS table: {0}")]
    Csv(#[from] csv::Error),
    #[error("AS{0} appears multiple times in the AS table")]
    DuplicateAsn(Asn),
    #[error("AS{0} collides with the reserved sentinel range")]
    SentinelCollision(Asn),
}

/// A single AS of the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsInfo {
    pub asn: Asn,
    /// Connectivity score (e.g., the customer cone size). `None` if the feed did not provide it.
    pub score: Option<u64>,
}

/// The full AS set, in input order.
#[derive(Debug, Clone, Default)]
pub struct AsPopulation {
    ases: Vec<AsInfo>,
    index: HashMap<Asn, usize>,
}

impl AsPopulation {
    /// Load the population from a CSV file with the columns `asn` and `score`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let rows: Vec<AsRow> = read_rows(path.as_ref())?;
        log::info!("Loaded {} ASes from {:?}", rows.len(), path.as_ref());
        Self::from_rows(&rows)
    }

    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a AsRow>) -> Result<Self, TopologyError> {
        Self::from_iter_checked(rows.into_iter().map(|r| AsInfo {
            asn: r.asn,
            score: r.score,
        }))
    }

    /// Build a population where every AS has a score.
    pub fn from_scores(
        scores: impl IntoIterator<Item = (Asn, u64)>,
    ) -> Result<Self, TopologyError> {
        Self::from_iter_checked(scores.into_iter().map(|(asn, score)| AsInfo {
            asn,
            score: Some(score),
        }))
    }

    fn from_iter_checked(ases: impl IntoIterator<Item = AsInfo>) -> Result<Self, TopologyError> {
        let mut population = Self::default();
        for info in ases {
            if is_reserved(info.asn) {
                return Err(TopologyError::SentinelCollision(info.asn));
            }
            match population.index.entry(info.asn) {
                Entry::Occupied(_) => return Err(TopologyError::DuplicateAsn(info.asn)),
                Entry::Vacant(e) => {
                    e.insert(population.ases.len());
                    population.ases.push(info);
                }
            }
        }
        Ok(population)
    }

    pub fn get(&self, asn: Asn) -> Option<&AsInfo> {
        self.index.get(&asn).map(|idx| &self.ases[*idx])
    }

    pub fn contains(&self, asn: Asn) -> bool {
        self.index.contains_key(&asn)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AsInfo> {
        self.ases.iter()
    }

    pub fn asns(&self) -> impl Iterator<Item = Asn> + '_ {
        self.ases.iter().map(|a| a.asn)
    }

    pub fn len(&self) -> usize {
        self.ases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ases.is_empty()
    }
}
