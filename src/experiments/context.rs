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

//! Trial keys and the storage namespace of every trial.
//!
//! Every trial writes its forwarding state into its own namespace of the shared record store. The
//! namespace is derived from the run identifier and the trial key, and is passed explicitly to
//! every operation that touches the store.
use std::fmt;

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scenarios::{AttackType, Policy};
use crate::adoption::{RandomSource, Stream};

lazy_static! {
    static ref NAMESPACE_RE: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
}

/// Error thrown for malformed namespaces.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Invalid namespace {0:?}: only lowercase letters, digits and underscores are allowed")]
    InvalidNamespace(String),
}

/// Identifies one trial of a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct TrialKey {
    pub attack_type: AttackType,
    pub policy: Policy,
    pub percent: u8,
    pub trial: usize,
}

impl TrialKey {
    pub fn new(attack_type: AttackType, policy: Policy, percent: u8, trial: usize) -> Self {
        Self {
            attack_type,
            policy,
            percent,
            trial,
        }
    }
}

impl fmt::Display for TrialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {}% #{}]",
            self.attack_type, self.policy, self.percent, self.trial
        )
    }
}

/// Storage namespace of a single trial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct TrialNamespace(String);

impl TrialNamespace {
    /// Derive the namespace of a trial. Two distinct keys of the same run never share a namespace.
    pub fn new(run_id: &str, key: &TrialKey) -> Result<Self, ContextError> {
        Self::from_raw(format!(
            "fwd_{run_id}_{}_{}_p{}_t{}",
            key.attack_type, key.policy, key.percent, key.trial
        ))
    }

    /// Use a namespace name as is, after checking it.
    pub fn from_raw(name: impl Into<String>) -> Result<Self, ContextError> {
        let name = name.into();
        if NAMESPACE_RE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(ContextError::InvalidNamespace(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrialNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a trial needs to know about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialContext {
    pub key: TrialKey,
    pub namespace: TrialNamespace,
    pub source: RandomSource,
}

impl TrialContext {
    pub fn new(run_id: &str, key: TrialKey, source: RandomSource) -> Result<Self, ContextError> {
        Ok(Self {
            namespace: TrialNamespace::new(run_id, &key)?,
            key,
            source,
        })
    }

    /// Generator for the given purpose (e.g., `"scenario"`, or `"adoption"` with the cohort name).
    ///
    /// The policy is not part of the stream: with a seed, every policy of the same attack type,
    /// percentage and trial index is evaluated on the same scenario and the same adopters.
    pub fn rng(&self, purpose: &Stream) -> StdRng {
        self.source.rng_for(&self.stream().then(purpose))
    }

    /// Stream identifying the trial, without the policy.
    fn stream(&self) -> Stream {
        Stream::new("trial")
            .name(&self.key.attack_type.to_string())
            .num(self.key.percent as u64)
            .num(self.key.trial as u64)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use itertools::iproduct;
    use rand::Rng;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn namespaces_are_unique() {
        let mut seen = HashSet::new();
        for (attack_type, policy, percent, trial) in
            iproduct!(AttackType::iter(), Policy::iter(), [0, 5, 50, 100], 0..10)
        {
            let key = TrialKey::new(attack_type, policy, percent, trial);
            let ns = TrialNamespace::new("run1", &key).unwrap();
            assert!(seen.insert(ns));
        }
        assert_eq!(
            TrialNamespace::new("run1", &TrialKey::new(AttackType::RouteLeak, Policy::Rovpp, 5, 1))
                .unwrap()
                .as_str(),
            "fwd_run1_route_leak_rovpp_p5_t1"
        );
    }

    #[test]
    fn invalid_namespace() {
        let key = TrialKey::new(AttackType::RouteLeak, Policy::Bgp, 0, 0);
        assert!(matches!(
            TrialNamespace::new("Run-1", &key),
            Err(ContextError::InvalidNamespace(_))
        ));
        assert!(TrialNamespace::from_raw("a; drop table").is_err());
    }

    #[test]
    fn policies_share_random_streams() {
        let source = RandomSource::Seeded(1);
        let a = TrialContext::new(
            "r",
            TrialKey::new(AttackType::SubprefixHijack, Policy::Bgp, 10, 2),
            source,
        )
        .unwrap();
        let b = TrialContext::new(
            "r",
            TrialKey::new(AttackType::SubprefixHijack, Policy::Rov, 10, 2),
            source,
        )
        .unwrap();
        let c = TrialContext::new(
            "r",
            TrialKey::new(AttackType::SubprefixHijack, Policy::Rov, 10, 3),
            source,
        )
        .unwrap();
        let draw = |ctx: &TrialContext| ctx.rng(&"scenario".into()).gen::<u64>();
        assert_eq!(draw(&a), draw(&b));
        assert_ne!(draw(&b), draw(&c));
        assert_ne!(a.namespace, b.namespace);

        let scenario = a.stream().then(&Stream::new("scenario"));
        assert_eq!(source.stream_seed(&scenario), Some(0xe1c1_021d_b6cd_569e));
        assert_eq!(b.stream(), a.stream());
    }
}
