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

//! Sample the adopting ASes of every cohort for a single trial.
use std::collections::HashSet;

use bitvec::prelude::*;
use rand::{prelude::*, seq::index};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cohorts::Cohort,
    records::{AdopterClass, Asn},
};

/// Error thrown when adopters cannot be sampled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("Adoption percentage {0} is not within 0 and 100")]
    InvalidPercentage(u8),
}

/// Domain separator of all stream seeds. Changing it changes every seeded run.
const STREAM_DOMAIN: &[u8] = b"hijack-eval stream v1";

/// Name of a random stream, encoded as bytes: every part is tagged, strings are prefixed with
/// their length, and all numbers are little-endian `u64`. The encoding does not depend on the
/// platform or on the compiler version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Stream(Vec<u8>);

impl Stream {
    pub fn new(purpose: &str) -> Self {
        Self::default().name(purpose)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.0.push(b's');
        self.0.extend_from_slice(&(name.len() as u64).to_le_bytes());
        self.0.extend_from_slice(name.as_bytes());
        self
    }

    pub fn num(mut self, x: u64) -> Self {
        self.0.push(b'n');
        self.0.extend_from_slice(&x.to_le_bytes());
        self
    }

    /// Append all parts of `other`.
    pub fn then(mut self, other: &Stream) -> Self {
        self.0.extend_from_slice(&other.0);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Stream {
    fn from(purpose: &str) -> Self {
        Self::new(purpose)
    }
}

/// Source of randomness for a run. Every consumer derives its own generator, such that concurrent
/// trials never share generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum RandomSource {
    /// Reproducible: the same seed and stream always produce the same generator.
    Seeded(u64),
    /// Every generator is seeded independently from the operating system.
    Entropy,
}

impl RandomSource {
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::Seeded).unwrap_or(Self::Entropy)
    }

    pub fn seed(&self) -> Option<u64> {
        match self {
            Self::Seeded(seed) => Some(*seed),
            Self::Entropy => None,
        }
    }

    /// Seed of the generator of a stream: the first 8 bytes (little-endian) of
    /// `BLAKE3(domain || seed || stream)`, with the seed as little-endian `u64`. `None` without a
    /// seed.
    pub fn stream_seed(&self, stream: &Stream) -> Option<u64> {
        let seed = self.seed()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(STREAM_DOMAIN);
        hasher.update(&seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Some(u64::from_le_bytes(bytes))
    }

    /// Create a new generator for the given stream.
    pub fn rng_for(&self, stream: &Stream) -> StdRng {
        match self.stream_seed(stream) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Adopter flags of the members of a single cohort, aligned with `Cohort::members`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortAdoption {
    members: Vec<Asn>,
    flags: BitVec,
}

impl CohortAdoption {
    /// Every member of the cohort is a non-adopter.
    pub fn none(cohort: &Cohort) -> Self {
        Self {
            members: cohort.members.clone(),
            flags: bitvec![0; cohort.len()],
        }
    }

    /// Mark exactly the given ASes as adopters (ASes outside of the cohort are ignored).
    pub fn from_adopters(cohort: &Cohort, adopters: &[Asn]) -> Self {
        let mut adoption = Self::none(cohort);
        for asn in adopters {
            if let Ok(idx) = adoption.members.binary_search(asn) {
                adoption.flags.set(idx, true);
            }
        }
        adoption
    }

    pub fn is_adopter(&self, asn: Asn) -> bool {
        self.members
            .binary_search(&asn)
            .map(|idx| self.flags[idx])
            .unwrap_or(false)
    }

    pub fn class_of(&self, asn: Asn) -> AdopterClass {
        AdopterClass::from_flag(self.is_adopter(asn))
    }

    /// Iterate over all members, together with their adopter class.
    pub fn iter(&self) -> impl Iterator<Item = (Asn, AdopterClass)> + '_ {
        self.members
            .iter()
            .zip(self.flags.iter().by_vals())
            .map(|(asn, flag)| (*asn, AdopterClass::from_flag(flag)))
    }

    pub fn adopters(&self) -> impl Iterator<Item = Asn> + '_ {
        self.flags.iter_ones().map(|idx| self.members[idx])
    }

    pub fn num_adopters(&self) -> usize {
        self.flags.count_ones()
    }
}

/// Number of adopters for a pool of `eligible` ASes at `percent`, respecting the cohort's minimum.
pub fn num_adopters(eligible: usize, percent: u8, min_adopters: usize) -> usize {
    let count = eligible * percent as usize / 100;
    count.max(min_adopters).min(eligible)
}

/// Select `floor(|eligible| * percent / 100)` adopters uniformly at random, without replacement.
/// The attacker is never eligible.
pub fn sample_adopters<R: Rng + ?Sized>(
    cohort: &Cohort,
    percent: u8,
    attacker: Asn,
    rng: &mut R,
) -> Result<CohortAdoption, SampleError> {
    if percent > 100 {
        return Err(SampleError::InvalidPercentage(percent));
    }
    let eligible: Vec<usize> = cohort
        .members
        .iter()
        .enumerate()
        .filter(|(_, asn)| **asn != attacker)
        .map(|(idx, _)| idx)
        .collect();
    let count = num_adopters(eligible.len(), percent, cohort.spec.min_adopters);

    let mut adoption = CohortAdoption::none(cohort);
    for pick in index::sample(rng, eligible.len(), count) {
        adoption.flags.set(eligible[pick], true);
    }
    log::trace!(
        "sampled {count} of {} eligible adopters in {} at {percent}%",
        eligible.len(),
        cohort.name()
    );
    Ok(adoption)
}

/// Union of all adopters of one trial, over all cohorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdoptionMap {
    adopters: HashSet<Asn>,
}

impl AdoptionMap {
    pub fn from_cohorts<'a>(cohorts: impl IntoIterator<Item = &'a CohortAdoption>) -> Self {
        Self {
            adopters: cohorts.into_iter().flat_map(|c| c.adopters()).collect(),
        }
    }

    pub fn contains(&self, asn: Asn) -> bool {
        self.adopters.contains(&asn)
    }

    pub fn len(&self) -> usize {
        self.adopters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adopters.is_empty()
    }

    /// All adopters, sorted by ASN.
    pub fn sorted(&self) -> Vec<Asn> {
        let mut adopters: Vec<Asn> = self.adopters.iter().copied().collect();
        adopters.sort_unstable();
        adopters
    }
}

impl FromIterator<Asn> for AdoptionMap {
    fn from_iter<T: IntoIterator<Item = Asn>>(iter: T) -> Self {
        Self {
            adopters: iter.into_iter().collect(),
        }
    }
}
