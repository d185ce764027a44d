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

//! Interface to the external path-propagation engine.
//!
//! The engine receives the announcements of the scenario, the policy and the set of adopters, and
//! returns the forwarding state of every AS as raw rows. How it selects routes is not our concern.
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;

use hijack_eval_utils::tables::{read_rows, write_rows, AdopterRow, AnnouncementRow, ForwardingRow};

use super::{
    context::TrialNamespace,
    scenarios::{Policy, Scenario},
};
use crate::adoption::AdoptionMap;

/// Error thrown by the propagation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot start the propagation engine {program:?}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("The propagation engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Cannot access {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Cannot exchange tables with the propagation engine: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Other(String),
}

/// Inputs of one propagation.
#[derive(Debug, Clone, Copy)]
pub struct PropagationInput<'a> {
    pub namespace: &'a TrialNamespace,
    pub scenario: &'a Scenario,
    pub policy: Policy,
    pub adopters: &'a AdoptionMap,
}

impl PropagationInput<'_> {
    pub fn announcement_rows(&self) -> Vec<AnnouncementRow> {
        self.scenario
            .announcements()
            .iter()
            .map(AnnouncementRow::from)
            .collect()
    }

    /// Adopters sorted by ASN.
    pub fn adopter_rows(&self) -> Vec<AdopterRow> {
        self.adopters
            .sorted()
            .into_iter()
            .map(|asn| AdopterRow {
                asn,
                policy: self.policy.to_string(),
            })
            .collect()
    }
}

/// The external collaborator computing the forwarding state of a trial.
pub trait PropagationEngine: Send + Sync {
    fn propagate(&self, input: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError>;
}

impl<F> PropagationEngine for F
where
    F: Fn(&PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> + Send + Sync,
{
    fn propagate(&self, input: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> {
        self(input)
    }
}

/// Runs an external program for every trial.
///
/// The arguments may contain the placeholders `{announcements}`, `{adopters}`, `{output}`,
/// `{policy}`, `{attack_type}` and `{namespace}`, which are replaced for every trial. The engine
/// must write the forwarding table as CSV (`asn,prefix,origin,received_from_asn`) to `{output}`.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    pub program: String,
    pub args: Vec<String>,
    /// Every trial gets its own sub-directory in here.
    pub work_dir: PathBuf,
    /// Keep the exchanged files after a successful propagation.
    pub keep_files: bool,
}

impl CommandEngine {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            work_dir: work_dir.into(),
            keep_files: false,
        }
    }

    /// Parse a command line, splitting at whitespace. The first word is the program.
    pub fn from_command_line(cmd: &str, work_dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let mut words = cmd.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| EngineError::Other("Empty propagation command".to_string()))?;
        Ok(Self::new(program, words.collect(), work_dir))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> EngineError + '_ {
    move |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl PropagationEngine for CommandEngine {
    fn propagate(&self, input: &PropagationInput<'_>) -> Result<Vec<ForwardingRow>, EngineError> {
        let dir = self.work_dir.join(input.namespace.as_str());
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let announcements = dir.join("announcements.csv");
        let adopters = dir.join("adopters.csv");
        let output = dir.join("forwarding.csv");
        write_rows(&announcements, &input.announcement_rows())?;
        write_rows(&adopters, &input.adopter_rows())?;

        let args = self.args.iter().map(|arg| {
            arg.replace("{announcements}", &announcements.to_string_lossy())
                .replace("{adopters}", &adopters.to_string_lossy())
                .replace("{output}", &output.to_string_lossy())
                .replace("{policy}", &input.policy.to_string())
                .replace("{attack_type}", &input.scenario.attack_type().to_string())
                .replace("{namespace}", input.namespace.as_str())
        });

        log::debug!("{}: running {}", input.namespace, self.program);
        let out = Command::new(&self.program)
            .args(args)
            .current_dir(&dir)
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !out.status.success() {
            return Err(EngineError::Failed {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        let rows = read_rows(&output)?;
        if !self.keep_files {
            fs::remove_dir_all(&dir).map_err(io_err(&dir))?;
        }
        Ok(rows)
    }
}
