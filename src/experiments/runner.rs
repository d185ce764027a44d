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

//! Module that executes all trials of a run in parallel and aggregates their results.
//!
//! Trials are grouped into batches of the same (attack type, policy, percentage). All trials of a
//! batch run in parallel on a thread pool; the aggregation of a batch starts only after all of its
//! trials are done. Each trial works in its own namespace of the shared record store, so a failing
//! trial cannot affect any other trial.
use std::{
    fmt,
    path::{Path, PathBuf},
};

use indicatif::{ParallelProgressIterator, ProgressBar};
use itertools::iproduct;
use rayon::prelude::*;
use thiserror::Error;

use super::{
    config::{ConfigError, RunConfig},
    context::{ContextError, TrialContext, TrialKey, TrialNamespace},
    engine::{EngineError, PropagationEngine, PropagationInput},
    scenarios::{AttackType, Policy, Scenario, ScenarioError, ScenarioGenerator},
    store::{RecordStore, StoreError},
};
use crate::{
    adoption::{sample_adopters, AdoptionMap, CohortAdoption, RandomSource, SampleError, Stream},
    analyzer::{analyze_cohort, AnalyzerError, TrialResult},
    cohorts::{Partition, PartitionError},
    forwarding::{ForwardingError, ForwardingTable},
    statistics::{aggregate, AggregateKey, AggregateStatistic, AggregationError},
    topology::AsPopulation,
};

/// Error of a single trial.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("{0}")]
    Scenario(#[from] ScenarioError),
    #[error("{0}")]
    Sample(#[from] SampleError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Forwarding(#[from] ForwardingError),
    #[error("{0}")]
    Analyzer(#[from] AnalyzerError),
}

/// A failed trial, together with everything needed to reproduce it.
#[derive(Debug)]
pub struct TrialFailure {
    pub key: TrialKey,
    pub namespace: TrialNamespace,
    pub seed: Option<u64>,
    pub scenario: Option<Scenario>,
    pub cohort: Option<String>,
    pub source: TrialError,
}

impl std::error::Error for TrialFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl fmt::Display for TrialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trial {} failed (namespace {}", self.key, self.namespace)?;
        match self.seed {
            Some(seed) => write!(f, ", seed {seed}")?,
            None => write!(f, ", unseeded")?,
        }
        if let Some(scenario) = self.scenario.as_ref() {
            write!(f, ", scenario {scenario}")?;
        }
        if let Some(cohort) = self.cohort.as_ref() {
            write!(f, ", cohort {cohort}")?;
        }
        write!(f, "): {}", self.source)
    }
}

/// Error that aborts the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Partition(#[from] PartitionError),
    #[error("{0}")]
    Context(#[from] ContextError),
    #[error("{0}")]
    Trial(#[from] Box<TrialFailure>),
    #[error("{0}")]
    Aggregation(#[from] AggregationError),
    #[error("Cannot write the results: {0}")]
    Output(#[from] csv::Error),
    #[error("Cannot write the results: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot create the thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Executes a run.
pub struct Runner<'a> {
    config: RunConfig,
    partition: Partition,
    generator: ScenarioGenerator,
    store: &'a dyn RecordStore,
    engine: &'a dyn PropagationEngine,
    run_id: String,
    source: RandomSource,
    progress: ProgressBar,
}

impl<'a> Runner<'a> {
    /// Validate the configuration and partition the population into cohorts.
    pub fn new(
        config: RunConfig,
        population: &AsPopulation,
        store: &'a dyn RecordStore,
        engine: &'a dyn PropagationEngine,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let partition = Partition::compute(population, &config.cohorts)?;
        let pool = |name: &str| {
            partition
                .get(name)
                .map(|c| c.members.clone())
                .unwrap_or_default()
        };
        let generator =
            ScenarioGenerator::new(pool(&config.attacker_cohort), pool(&config.victim_cohort))
                .with_parties(config.attacker, config.victim);
        let source = RandomSource::from_seed(config.seed);
        log::info!(
            "Partitioned {} ASes into {}",
            partition.num_ases(),
            partition
                .cohorts()
                .iter()
                .map(|c| format!("{} ({})", c.name(), c.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self {
            config,
            partition,
            generator,
            store,
            engine,
            run_id: "run".to_string(),
            source,
            progress: ProgressBar::hidden(),
        })
    }

    /// Identifier of the run, used to derive the trial namespaces. Must consist of lowercase
    /// letters, digits and underscores.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Report the progress (in number of trials) to the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        progress.set_length(self.config.num_trials() as u64);
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Execute a single trial and analyze it for every cohort.
    pub fn run_trial(&self, ctx: &TrialContext) -> Result<Vec<TrialResult>, TrialFailure> {
        let failure = |source: TrialError, scenario: Option<&Scenario>, cohort: Option<&str>| {
            TrialFailure {
                key: ctx.key.clone(),
                namespace: ctx.namespace.clone(),
                seed: ctx.source.seed(),
                scenario: scenario.cloned(),
                cohort: cohort.map(String::from),
                source,
            }
        };

        let scenario = self
            .generator
            .generate(ctx.key.attack_type, &mut ctx.rng(&Stream::new("scenario")))
            .map_err(|e| failure(e.into(), None, None))?;
        log::debug!("{} {}: {scenario}", ctx.key, ctx.namespace);

        let adoptions = self
            .partition
            .cohorts()
            .iter()
            .map(|cohort| {
                sample_adopters(
                    cohort,
                    ctx.key.percent,
                    scenario.attacker(),
                    &mut ctx.rng(&Stream::new("adoption").name(cohort.name())),
                )
                .map_err(|e| failure(e.into(), Some(&scenario), Some(cohort.name())))
            })
            .collect::<Result<Vec<CohortAdoption>, _>>()?;
        let adopters = AdoptionMap::from_cohorts(&adoptions);

        let table = self
            .propagate(ctx, &scenario, &adopters)
            .map_err(|e| failure(e, Some(&scenario), None))?;

        let results = self
            .partition
            .cohorts()
            .iter()
            .zip(adoptions.iter())
            .map(|(cohort, adoption)| {
                analyze_cohort(&ctx.key, cohort.name(), adoption, &table, &scenario)
                    .map_err(|e| failure(e.into(), Some(&scenario), Some(cohort.name())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // only successful trials release their namespace; failed ones are kept for inspection
        self.store
            .drop_namespace(&ctx.namespace)
            .map_err(|e| failure(e.into(), Some(&scenario), None))?;
        Ok(results)
    }

    /// Run the external propagation in the trial's namespace and load the forwarding table back.
    fn propagate(
        &self,
        ctx: &TrialContext,
        scenario: &Scenario,
        adopters: &AdoptionMap,
    ) -> Result<ForwardingTable, TrialError> {
        self.store.create_namespace(&ctx.namespace)?;
        let input = PropagationInput {
            namespace: &ctx.namespace,
            scenario,
            policy: ctx.key.policy,
            adopters,
        };
        let rows = self.engine.propagate(&input)?;
        self.store.write_records(&ctx.namespace, &rows)?;
        let rows = self.store.read_records(&ctx.namespace)?;
        let table = ForwardingTable::from_rows(&rows)?;
        log::trace!(
            "{}: {} records of {} ASes",
            ctx.namespace,
            table.num_records(),
            table.len()
        );
        Ok(table)
    }

    /// Run all trials of one (attack type, policy, percentage) in parallel, and aggregate them per
    /// cohort.
    pub fn run_batch(
        &self,
        attack_type: AttackType,
        policy: Policy,
        percent: u8,
    ) -> Result<Vec<AggregateStatistic>, RunError> {
        let contexts = (0..self.config.trials)
            .map(|trial| {
                TrialContext::new(
                    &self.run_id,
                    TrialKey::new(attack_type, policy, percent, trial),
                    self.source,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results: Vec<Vec<TrialResult>> = contexts
            .into_par_iter()
            .progress_with(self.progress.clone())
            .map(|ctx| {
                self.run_trial(&ctx).map_err(|e| {
                    log::error!("{e}");
                    Box::new(e)
                })
            })
            .collect::<Result<_, _>>()?;

        self.partition
            .cohorts()
            .iter()
            .enumerate()
            .map(|(idx, cohort)| {
                let key = AggregateKey {
                    cohort: cohort.name().to_string(),
                    attack_type,
                    policy,
                    percent,
                };
                let cohort_results: Vec<TrialResult> =
                    results.iter().map(|r| r[idx].clone()).collect();
                Ok(aggregate(&key, &cohort_results)?)
            })
            .collect()
    }

    /// Execute the run, passing the statistics of every batch to `sink` as soon as it is done.
    pub fn run_with<F>(&self, mut sink: F) -> Result<(), RunError>
    where
        F: FnMut(&[AggregateStatistic]) -> Result<(), RunError>,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_workers())
            .build()?;
        log::info!(
            "Running {} trials on {} workers",
            self.config.num_trials(),
            self.config.num_workers()
        );
        for (attack_type, policy, percent) in iproduct!(
            self.config.attack_types.iter().copied(),
            self.config.policies.iter().copied(),
            self.config.percentages.iter().copied()
        ) {
            let stats = pool.install(|| self.run_batch(attack_type, policy, percent))?;
            log::debug!("Finished {attack_type} {policy} {percent}%");
            sink(&stats)?;
        }
        self.progress.finish();
        Ok(())
    }

    /// Execute the run and collect all statistics.
    pub fn run(&self) -> Result<Vec<AggregateStatistic>, RunError> {
        let mut all = Vec::new();
        self.run_with(|stats| {
            all.extend_from_slice(stats);
            Ok(())
        })?;
        Ok(all)
    }

    /// Execute the run, writing the statistics to `{out_prefix}_{timestamp}.csv`. Returns the name
    /// of the written file.
    pub fn run_to_csv(&self, out_prefix: impl AsRef<Path>) -> Result<PathBuf, RunError> {
        let filename = PathBuf::from(format!(
            "{}_{}.csv",
            out_prefix.as_ref().display(),
            chrono::Local::now().format("%Y-%m-%d_%H:%M:%S")
        ));
        let mut csv_writer = csv::Writer::from_path(&filename)?;
        csv_writer.write_record(AggregateStatistic::record_title())?;
        csv_writer.flush()?;

        self.run_with(|stats| {
            for stat in stats {
                csv_writer.write_record(stat.record())?;
            }
            csv_writer.flush()?;
            Ok(())
        })?;
        log::info!("Results written to {filename:?}");
        Ok(filename)
    }
}
