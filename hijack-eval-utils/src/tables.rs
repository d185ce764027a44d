//! Raw row types of the tables exchanged with external collaborators.
//!
//! The types in here are deliberately untyped (plain integers and strings). Validation, e.g.,
//! parsing prefixes or mapping the reserved sentinel ASNs, happens in the main crate.

use std::{io, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// One AS of the population, together with its auxiliary ranking attribute (e.g., the customer
/// cone size). A missing score is kept as `None` such that the consumer can reject it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AsRow {
    pub asn: u32,
    #[serde(default)]
    pub score: Option<u64>,
}

/// One forwarding decision as written by the external propagation engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ForwardingRow {
    pub asn: u32,
    /// Prefix in CIDR notation.
    pub prefix: String,
    pub origin: u32,
    pub received_from_asn: u32,
}

/// Seed announcement handed to the external propagation engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnnouncementRow {
    /// AS that originates (or leaks) the announcement.
    pub asn: u32,
    pub prefix: String,
    /// Origin ASN carried in the AS path.
    pub origin: u32,
    /// Sentinel the engine should write as `received_from_asn` at the announcing AS.
    pub received_from_asn: u32,
}

/// Adopting AS handed to the external propagation engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdopterRow {
    pub asn: u32,
    pub policy: String,
}

/// Read all rows of a CSV file with a header line.
pub fn read_rows<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, csv::Error> {
    log::trace!("Loading rows from {:?}", path.as_ref());
    csv::Reader::from_path(path)?.deserialize().collect()
}

/// Read all rows from any reader containing CSV data with a header line.
pub fn read_rows_from<R: io::Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>, csv::Error> {
    csv::Reader::from_reader(reader).deserialize().collect()
}

/// Write all rows into a CSV file, replacing it if it exists.
pub fn write_rows<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
