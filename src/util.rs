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

//! Utility module collection of functions

use std::{env, path::Path};

use log::{LevelFilter, Log};

/// Configuration file of `log4rs`, looked up in the working directory.
pub const LOG_CONFIG: &str = "log4rs.yml";

/// Build the logger without installing it. Uses `log4rs.yml` if it exists, and `RUST_LOG` through
/// `pretty_env_logger` otherwise.
pub fn build_logger() -> Result<(Box<dyn Log>, LevelFilter), Box<dyn std::error::Error>> {
    if Path::new(LOG_CONFIG).exists() {
        let config = log4rs::config::load_config_file(LOG_CONFIG, Default::default())?;
        let logger = log4rs::Logger::new(config);
        let level = logger.max_log_level();
        Ok((Box::new(logger), level))
    } else {
        let mut builder = pretty_env_logger::formatted_builder();
        if let Ok(filters) = env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        let logger = builder.build();
        let level = logger.filter();
        Ok((Box::new(logger), level))
    }
}

/// Number of worker threads used when the configuration does not specify it.
pub fn num_workers() -> usize {
    num_cpus::get()
}
