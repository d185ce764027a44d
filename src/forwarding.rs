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

//! Per-trial forwarding state, stored as an arena of ASes with O(1) lookup by ASN.
use std::{
    collections::{hash_map::Entry, HashMap},
    net::Ipv4Addr,
};

use ipnet::Ipv4Net;
use thiserror::Error;

use hijack_eval_utils::tables::ForwardingRow;

use crate::records::{is_reserved, Asn, ForwardingRecord, ReceivedFrom};

/// Error thrown when the forwarding state of the propagation engine cannot be loaded.
#[derive(Debug, Error)]
pub enum ForwardingError {
    /// The prefix column cannot be parsed.
    #[error("AS{asn} has an invalid prefix {prefix:?}: {source}")]
    InvalidPrefix {
        asn: Asn,
        prefix: String,
        source: ipnet::AddrParseError,
    },
    /// A real AS (or origin) uses a number of the reserved sentinel range.
    #[error("AS{asn} collides with the reserved sentinel range (record: {record})")]
    SentinelCollision { asn: Asn, record: String },
    /// The engine wrote two records for the same AS and prefix.
    #[error("AS{asn} has multiple records for {prefix}")]
    DuplicateRecord { asn: Asn, prefix: Ipv4Net },
}

/// All records of a single AS, ordered from the most to the least specific prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsEntry {
    pub asn: Asn,
    records: Vec<ForwardingRecord>,
}

impl AsEntry {
    pub fn records(&self) -> &[ForwardingRecord] {
        &self.records
    }

    /// Longest-prefix match on the AS's own records.
    pub fn route_for(&self, dst: Ipv4Addr) -> Option<&ForwardingRecord> {
        self.records.iter().find(|r| r.prefix.contains(&dst))
    }

    /// Record for exactly the given prefix.
    pub fn record_for(&self, prefix: &Ipv4Net) -> Option<&ForwardingRecord> {
        self.records.iter().find(|r| r.prefix == *prefix)
    }
}

/// Forwarding state of one trial.
#[derive(Debug, Clone, Default)]
pub struct ForwardingTable {
    entries: Vec<AsEntry>,
    index: HashMap<Asn, usize>,
}

impl ForwardingTable {
    /// Parse and validate the raw rows of the propagation engine.
    pub fn from_rows<'a>(
        rows: impl IntoIterator<Item = &'a ForwardingRow>,
    ) -> Result<Self, ForwardingError> {
        let records = rows
            .into_iter()
            .map(ForwardingRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_records(records)
    }

    /// Build the table from already parsed records.
    pub fn from_records(
        records: impl IntoIterator<Item = ForwardingRecord>,
    ) -> Result<Self, ForwardingError> {
        let mut table = Self::default();
        for record in records {
            table.insert(record)?;
        }
        for entry in table.entries.iter_mut() {
            entry
                .records
                .sort_by(|a, b| b.prefix.prefix_len().cmp(&a.prefix.prefix_len()));
        }
        log::trace!(
            "loaded forwarding table with {} ASes and {} records",
            table.entries.len(),
            table.num_records()
        );
        Ok(table)
    }

    fn insert(&mut self, record: ForwardingRecord) -> Result<(), ForwardingError> {
        if is_reserved(record.asn) || is_reserved(record.origin) {
            return Err(ForwardingError::SentinelCollision {
                asn: if is_reserved(record.asn) {
                    record.asn
                } else {
                    record.origin
                },
                record: record.to_string(),
            });
        }
        let idx = match self.index.entry(record.asn) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                self.entries.push(AsEntry {
                    asn: record.asn,
                    records: Vec::new(),
                });
                *e.insert(self.entries.len() - 1)
            }
        };
        let entry = &mut self.entries[idx];
        if entry.record_for(&record.prefix).is_some() {
            return Err(ForwardingError::DuplicateRecord {
                asn: record.asn,
                prefix: record.prefix,
            });
        }
        entry.records.push(record);
        Ok(())
    }

    pub fn get(&self, asn: Asn) -> Option<&AsEntry> {
        self.index.get(&asn).map(|idx| &self.entries[*idx])
    }

    pub fn contains(&self, asn: Asn) -> bool {
        self.index.contains_key(&asn)
    }

    /// All records of an AS; empty if the AS has no RIB at all.
    pub fn records(&self, asn: Asn) -> &[ForwardingRecord] {
        self.get(asn).map(AsEntry::records).unwrap_or_default()
    }

    /// The record an AS uses to forward traffic towards `dst` (longest-prefix match).
    pub fn route_for(&self, asn: Asn, dst: Ipv4Addr) -> Option<&ForwardingRecord> {
        self.get(asn).and_then(|e| e.route_for(dst))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AsEntry> {
        self.entries.iter()
    }

    /// Number of ASes with at least one record.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_records(&self) -> usize {
        self.entries.iter().map(|e| e.records.len()).sum()
    }
}

impl TryFrom<&ForwardingRow> for ForwardingRecord {
    type Error = ForwardingError;

    fn try_from(row: &ForwardingRow) -> Result<Self, Self::Error> {
        let prefix: Ipv4Net =
            row.prefix
                .trim()
                .parse()
                .map_err(|source| ForwardingError::InvalidPrefix {
                    asn: row.asn,
                    prefix: row.prefix.clone(),
                    source,
                })?;
        Ok(Self {
            asn: row.asn,
            prefix: prefix.trunc(),
            origin: row.origin,
            received_from: ReceivedFrom::from(row.received_from_asn),
        })
    }
}

impl From<&ForwardingRecord> for ForwardingRow {
    fn from(record: &ForwardingRecord) -> Self {
        Self {
            asn: record.asn,
            prefix: record.prefix.to_string(),
            origin: record.origin,
            received_from_asn: record.received_from.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::records::TerminalCondition;

    fn row(asn: Asn, prefix: &str, origin: Asn, from: Asn) -> ForwardingRow {
        ForwardingRow {
            asn,
            prefix: prefix.to_string(),
            origin,
            received_from_asn: from,
        }
    }

    #[test]
    fn longest_prefix_match() {
        let rows = vec![
            row(88, "1.2.0.0/16", 99, 44),
            row(88, "1.2.3.0/24", 666, 666),
            row(44, "1.2.0.0/16", 99, 99),
        ];
        let table = ForwardingTable::from_rows(&rows).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.num_records(), 3);

        let dst: Ipv4Addr = "1.2.3.1".parse().unwrap();
        let route = table.route_for(88, dst).unwrap();
        assert_eq!(route.origin, 666);
        assert_eq!(route.received_from, ReceivedFrom::Neighbor(666));

        let other: Ipv4Addr = "1.2.4.1".parse().unwrap();
        assert_eq!(table.route_for(88, other).unwrap().origin, 99);
        assert_eq!(table.route_for(44, dst).unwrap().origin, 99);
        assert!(table.route_for(77, dst).is_none());
        assert!(table.records(77).is_empty());
    }

    #[test]
    fn sentinels_are_mapped() {
        let rows = vec![row(666, "1.2.3.0/24", 666, 64513)];
        let table = ForwardingTable::from_rows(&rows).unwrap();
        assert_eq!(
            table.records(666)[0].received_from,
            ReceivedFrom::Terminal(TerminalCondition::Hijacked)
        );
    }

    #[test]
    fn sentinel_collision() {
        let rows = vec![row(64513, "1.2.3.0/24", 666, 666)];
        assert!(matches!(
            ForwardingTable::from_rows(&rows),
            Err(ForwardingError::SentinelCollision { asn: 64513, .. })
        ));
        let rows = vec![row(1, "1.2.3.0/24", 64512, 666)];
        assert!(matches!(
            ForwardingTable::from_rows(&rows),
            Err(ForwardingError::SentinelCollision { asn: 64512, .. })
        ));
    }

    #[test]
    fn duplicate_record() {
        let rows = vec![row(1, "1.2.0.0/16", 99, 2), row(1, "1.2.0.0/16", 99, 3)];
        assert!(matches!(
            ForwardingTable::from_rows(&rows),
            Err(ForwardingError::DuplicateRecord { asn: 1, .. })
        ));
    }

    #[test]
    fn invalid_prefix() {
        let rows = vec![row(1, "1.2.0.0/33", 99, 2)];
        assert!(matches!(
            ForwardingTable::from_rows(&rows),
            Err(ForwardingError::InvalidPrefix { asn: 1, .. })
        ));
    }

    #[test]
    fn row_conversion() {
        let original = row(666, "1.2.3.0/24", 666, 64513);
        let record = ForwardingRecord::try_from(&original).unwrap();
        assert_eq!(ForwardingRow::from(&record), original);
    }
}
