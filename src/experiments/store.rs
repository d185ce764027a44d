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

//! The record store shared by all concurrent trials.
//!
//! Each trial owns exactly one namespace of the store. A namespace can only be created once per
//! store, even after it was dropped again. Creating it a second time means that two trials would
//! share (and corrupt) the same forwarding state, which is a fatal error.
use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use thiserror::Error;

use hijack_eval_utils::tables::{read_rows, write_rows, ForwardingRow};

use super::context::TrialNamespace;

/// Name of the forwarding table inside a namespace directory.
pub const FORWARDING_FILE: &str = "forwarding.csv";

/// Error thrown by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Namespace collision: {0} was already created in this run")]
    NamespaceCollision(TrialNamespace),
    #[error("Namespace {0} does not exist")]
    UnknownNamespace(TrialNamespace),
    #[error("Cannot access {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Cannot read or write the forwarding table: {0}")]
    Csv(#[from] csv::Error),
    #[error("The store was poisoned by a panicking trial")]
    Poisoned,
}

/// Storage for the forwarding state of all trials.
pub trait RecordStore: Send + Sync {
    /// Reserve a fresh namespace.
    fn create_namespace(&self, ns: &TrialNamespace) -> Result<(), StoreError>;

    /// Append records to an existing namespace.
    fn write_records(&self, ns: &TrialNamespace, rows: &[ForwardingRow]) -> Result<(), StoreError>;

    /// Read all records of a namespace.
    fn read_records(&self, ns: &TrialNamespace) -> Result<Vec<ForwardingRow>, StoreError>;

    /// Remove all records of a namespace. The namespace cannot be created again.
    fn drop_namespace(&self, ns: &TrialNamespace) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<TrialNamespace, Vec<ForwardingRow>>,
    created: HashSet<TrialNamespace>,
}

/// Record store keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of namespaces that currently hold data.
    pub fn num_live(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.tables.len())
    }
}

impl RecordStore for MemoryStore {
    fn create_namespace(&self, ns: &TrialNamespace) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.created.insert(ns.clone()) {
            return Err(StoreError::NamespaceCollision(ns.clone()));
        }
        state.tables.insert(ns.clone(), Vec::new());
        Ok(())
    }

    fn write_records(&self, ns: &TrialNamespace, rows: &[ForwardingRow]) -> Result<(), StoreError> {
        self.lock()?
            .tables
            .get_mut(ns)
            .ok_or_else(|| StoreError::UnknownNamespace(ns.clone()))?
            .extend_from_slice(rows);
        Ok(())
    }

    fn read_records(&self, ns: &TrialNamespace) -> Result<Vec<ForwardingRow>, StoreError> {
        self.lock()?
            .tables
            .get(ns)
            .cloned()
            .ok_or_else(|| StoreError::UnknownNamespace(ns.clone()))
    }

    fn drop_namespace(&self, ns: &TrialNamespace) -> Result<(), StoreError> {
        self.lock()?
            .tables
            .remove(ns)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownNamespace(ns.clone()))
    }
}

/// Record store with one directory per namespace, each holding a single CSV file.
#[derive(Debug)]
pub struct CsvDirStore {
    root: PathBuf,
    created: Mutex<HashSet<TrialNamespace>>,
}

impl CsvDirStore {
    /// Create the store in `root`, creating the directory if necessary.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            created: Default::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the namespace.
    pub fn path(&self, ns: &TrialNamespace) -> PathBuf {
        self.root.join(ns.as_str())
    }

    fn table(&self, ns: &TrialNamespace) -> Result<PathBuf, StoreError> {
        let dir = self.path(ns);
        if dir.is_dir() {
            Ok(dir.join(FORWARDING_FILE))
        } else {
            Err(StoreError::UnknownNamespace(ns.clone()))
        }
    }
}

impl RecordStore for CsvDirStore {
    fn create_namespace(&self, ns: &TrialNamespace) -> Result<(), StoreError> {
        if !self
            .created
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(ns.clone())
        {
            return Err(StoreError::NamespaceCollision(ns.clone()));
        }
        let dir = self.path(ns);
        // a leftover directory of another process is a collision as well
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::NamespaceCollision(ns.clone()))
            }
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        }
        write_rows::<ForwardingRow>(dir.join(FORWARDING_FILE), &[])?;
        Ok(())
    }

    fn write_records(&self, ns: &TrialNamespace, rows: &[ForwardingRow]) -> Result<(), StoreError> {
        let path = self.table(ns)?;
        let mut all = read_rows::<ForwardingRow>(&path)?;
        all.extend_from_slice(rows);
        write_rows(&path, &all)?;
        Ok(())
    }

    fn read_records(&self, ns: &TrialNamespace) -> Result<Vec<ForwardingRow>, StoreError> {
        Ok(read_rows(self.table(ns)?)?)
    }

    fn drop_namespace(&self, ns: &TrialNamespace) -> Result<(), StoreError> {
        let dir = self.path(ns);
        if !dir.is_dir() {
            return Err(StoreError::UnknownNamespace(ns.clone()));
        }
        fs::remove_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })
    }
}
