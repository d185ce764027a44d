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

//! Configuration of a run.
use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scenarios::{AttackType, Policy};
use crate::{
    cohorts::{default_cohorts, validate_specs, CohortSpec, PartitionError},
    records::Asn,
};

/// Error thrown for invalid configurations. Raised before any trial starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read the configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse the configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No adoption percentages configured")]
    NoPercentages,
    #[error("Adoption percentage {0} is larger than 100")]
    InvalidPercentage(u8),
    #[error("Adoption percentage {0} is configured twice")]
    DuplicatePercentage(u8),
    #[error("The number of trials must be positive")]
    NoTrials,
    #[error("No attack types configured")]
    NoAttackTypes,
    #[error("No policies configured")]
    NoPolicies,
    #[error("The number of workers must be positive")]
    NoWorkers,
    #[error("Invalid cohorts: {0}")]
    Cohorts(#[from] PartitionError),
    #[error("The {role} cohort {name:?} is not configured")]
    UnknownCohort { role: &'static str, name: String },
    #[error("Attacker and victim are both fixed to AS{0}")]
    SameParty(Asn),
}

fn default_percentages() -> Vec<u8> {
    vec![0, 10, 20, 50, 80, 100]
}

fn default_trials() -> usize {
    10
}

fn default_attack_types() -> Vec<AttackType> {
    vec![AttackType::SubprefixHijack]
}

fn default_policies() -> Vec<Policy> {
    vec![
        Policy::Bgp,
        Policy::Rov,
        Policy::Rovpp,
        Policy::RovppBlackhole,
        Policy::RovppPreventive,
    ]
}

fn default_party_cohort() -> String {
    "edge".to_string()
}

/// All options of a run. Loaded from a JSON file; missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunConfig {
    /// Adoption percentages to test, in the order in which they are run.
    #[serde(default = "default_percentages")]
    pub percentages: Vec<u8>,
    /// Number of trials per (attack type, policy, percentage).
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default = "default_attack_types")]
    pub attack_types: Vec<AttackType>,
    #[serde(default = "default_policies")]
    pub policies: Vec<Policy>,
    /// Make the run reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of worker threads. Defaults to the number of CPUs.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Ordered cohort specifications; the last one must be the catch-all.
    #[serde(default = "default_cohorts")]
    pub cohorts: Vec<CohortSpec>,
    /// Cohort from which the attacker is sampled.
    #[serde(default = "default_party_cohort")]
    pub attacker_cohort: String,
    /// Cohort from which the victim is sampled.
    #[serde(default = "default_party_cohort")]
    pub victim_cohort: String,
    /// Always use this attacker.
    #[serde(default)]
    pub attacker: Option<Asn>,
    /// Always use this victim.
    #[serde(default)]
    pub victim: Option<Asn>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            percentages: default_percentages(),
            trials: default_trials(),
            attack_types: default_attack_types(),
            policies: default_policies(),
            seed: None,
            workers: None,
            cohorts: default_cohorts(),
            attacker_cohort: default_party_cohort(),
            victim_cohort: default_party_cohort(),
            attacker: None,
            victim: None,
        }
    }
}

impl RunConfig {
    /// Load and validate the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.percentages.is_empty() {
            return Err(ConfigError::NoPercentages);
        }
        let mut seen = HashSet::new();
        for p in self.percentages.iter().copied() {
            if p > 100 {
                return Err(ConfigError::InvalidPercentage(p));
            }
            if !seen.insert(p) {
                return Err(ConfigError::DuplicatePercentage(p));
            }
        }
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.attack_types.is_empty() {
            return Err(ConfigError::NoAttackTypes);
        }
        if self.policies.is_empty() {
            return Err(ConfigError::NoPolicies);
        }
        if self.workers == Some(0) {
            return Err(ConfigError::NoWorkers);
        }
        validate_specs(&self.cohorts)?;
        for (role, name) in [
            ("attacker", &self.attacker_cohort),
            ("victim", &self.victim_cohort),
        ] {
            if !self.cohorts.iter().any(|c| &c.name == name) {
                return Err(ConfigError::UnknownCohort {
                    role,
                    name: name.clone(),
                });
            }
        }
        if let (Some(a), Some(v)) = (self.attacker, self.victim) {
            if a == v {
                return Err(ConfigError::SameParty(a));
            }
        }
        Ok(())
    }

    /// Number of worker threads to use.
    pub fn num_workers(&self) -> usize {
        self.workers.unwrap_or_else(crate::util::num_workers)
    }

    /// Total number of trials of the run.
    pub fn num_trials(&self) -> usize {
        self.attack_types.len() * self.policies.len() * self.percentages.len() * self.trials
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cohorts::CohortSelector;

    #[test]
    fn defaults_are_valid() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        config.validate().unwrap();
        assert_eq!(config.num_trials(), 5 * 6 * 10);
    }

    #[test]
    fn parse() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "percentages": [0, 100],
                "trials": 3,
                "attack_types": ["subprefix_hijack", "route_leak"],
                "policies": ["rov", "rovpp_bp"],
                "seed": 42,
                "cohorts": [
                    {"name": "transit", "selector": {"top_k": 1}},
                    {"name": "edge", "selector": {"score_equals": 0}, "min_adopters": 1},
                    {"name": "rest", "selector": "remainder"}
                ]
            }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.policies, vec![Policy::Rov, Policy::RovppPreventive]);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.cohorts[0].selector, CohortSelector::TopK(1));
        assert_eq!(config.cohorts[1].min_adopters, 1);
        assert_eq!(config.cohorts[2].min_adopters, 0);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let check = |f: fn(&mut RunConfig)| {
            let mut config = RunConfig::default();
            f(&mut config);
            config.validate()
        };
        assert!(matches!(check(|c| c.percentages.clear()), Err(ConfigError::NoPercentages)));
        assert!(matches!(
            check(|c| c.percentages = vec![0, 101]),
            Err(ConfigError::InvalidPercentage(101))
        ));
        assert!(matches!(
            check(|c| c.percentages = vec![10, 10]),
            Err(ConfigError::DuplicatePercentage(10))
        ));
        assert!(matches!(check(|c| c.trials = 0), Err(ConfigError::NoTrials)));
        assert!(matches!(check(|c| c.policies.clear()), Err(ConfigError::NoPolicies)));
        assert!(matches!(check(|c| c.attack_types.clear()), Err(ConfigError::NoAttackTypes)));
        assert!(matches!(check(|c| c.workers = Some(0)), Err(ConfigError::NoWorkers)));
        assert!(matches!(
            check(|c| {
                c.cohorts.pop();
            }),
            Err(ConfigError::Cohorts(PartitionError::CatchAllNotLast(_)))
        ));
        assert!(matches!(
            check(|c| c.victim_cohort = "stubs".to_string()),
            Err(ConfigError::UnknownCohort { role: "victim", .. })
        ));
        assert!(matches!(
            check(|c| {
                c.attacker = Some(1);
                c.victim = Some(1);
            }),
            Err(ConfigError::SameParty(1))
        ));
    }
}
