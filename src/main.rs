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

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;

use hijack_eval::{
    experiments::{CommandEngine, CsvDirStore, MemoryStore, RecordStore, RunConfig, Runner},
    topology::AsPopulation,
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// CSV file of the AS population, with the columns `asn` and `score`.
    #[arg(short, long)]
    ases: PathBuf,
    /// Command running the propagation engine for a single trial. Supports the placeholders
    /// `{announcements}`, `{adopters}`, `{output}`, `{policy}`, `{attack_type}` and `{namespace}`.
    #[arg(short, long)]
    engine: String,
    /// JSON configuration of the run. Uses the default configuration if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Prefix of the output file. The timestamp and `.csv` are appended.
    #[arg(short, long, default_value = "hijack_eval")]
    output: String,
    /// Working directory of the propagation engine.
    #[arg(long, default_value = "./work/")]
    work_dir: PathBuf,
    /// Keep the forwarding state of all trials in this directory instead of in memory.
    #[arg(long)]
    store_dir: Option<PathBuf>,
    /// Keep the files exchanged with the propagation engine.
    #[arg(long)]
    keep_files: bool,
    /// Overwrite the seed of the configuration.
    #[arg(short, long)]
    seed: Option<u64>,
    /// Overwrite the number of worker threads.
    #[arg(short, long)]
    workers: Option<usize>,
    /// Overwrite the number of trials per percentage.
    #[arg(short, long)]
    trials: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let (logger, level) = util::build_logger()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Cannot initialize logging")?;
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);

    let args = Args::parse();

    let mut config = match args.config.as_ref() {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Cannot load the configuration {path:?}"))?,
        None => RunConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    if let Some(trials) = args.trials {
        config.trials = trials;
    }

    let population = AsPopulation::load(&args.ases)
        .with_context(|| format!("Cannot load the AS population from {:?}", args.ases))?;

    let mut engine = CommandEngine::from_command_line(&args.engine, &args.work_dir)?;
    engine.keep_files = args.keep_files;

    let store: Box<dyn RecordStore> = match args.store_dir.as_ref() {
        Some(dir) => Box::new(CsvDirStore::new(dir)?),
        None => Box::new(MemoryStore::new()),
    };

    let run_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let progress = multi.add(
        ProgressBar::new(0).with_style(
            ProgressStyle::with_template(
                "[{bar:80}] trial: {pos:>7}/{len:7}, elapsed: {elapsed}, eta: {eta}",
            )?
            .progress_chars("##-"),
        ),
    );

    let runner = Runner::new(config, &population, store.as_ref(), &engine)?
        .with_run_id(run_id)
        .with_progress(progress);
    let filename = runner.run_to_csv(&args.output)?;
    log::info!("Done, wrote {filename:?}");

    Ok(())
}
