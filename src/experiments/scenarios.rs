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

//! Module containing the attack types, defense policies, and the scenario generator.
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use lazy_static::lazy_static;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hijack_eval_utils::tables::AnnouncementRow;

use crate::records::{Asn, TerminalCondition};

lazy_static! {
    /// Prefix owned by the victim.
    pub static ref VICTIM_PREFIX: Ipv4Net = "1.2.0.0/16".parse().unwrap();
    /// More specific prefix within the victim's prefix.
    pub static ref SUBPREFIX: Ipv4Net = "1.2.3.0/24".parse().unwrap();
    /// Less specific prefix covering the victim's prefix.
    pub static ref SUPERPREFIX: Ipv4Net = "1.0.0.0/8".parse().unwrap();
}

/// Address whose reachability is evaluated. It is covered by every prefix announced in any
/// scenario, such that the data plane uses the most specific announcement.
pub const DESTINATION: Ipv4Addr = Ipv4Addr::new(1, 2, 3, 1);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
/// Type of the simulated attack.
pub enum AttackType {
    /// The attacker announces a more specific prefix of the victim's prefix.
    SubprefixHijack,
    /// The attacker announces the victim's prefix.
    PrefixHijack,
    /// The attacker announces both a covering prefix and the victim's prefix.
    SuperprefixPrefixHijack,
    /// The attacker announces a prefix that the victim owns but does not announce.
    UnannouncedPrefixHijack,
    /// The attacker announces a more specific prefix of an unannounced victim prefix.
    UnannouncedSubprefixHijack,
    /// The attacker announces a prefix covering an unannounced victim prefix.
    UnannouncedSuperprefixHijack,
    /// The attacker re-announces the victim's route, keeping the victim as origin.
    RouteLeak,
}

impl AttackType {
    /// Whether the victim announces its prefix.
    pub fn victim_announces(&self) -> bool {
        !matches!(
            self,
            Self::UnannouncedPrefixHijack
                | Self::UnannouncedSubprefixHijack
                | Self::UnannouncedSuperprefixHijack
        )
    }

    /// Prefixes announced by the attacker.
    pub fn attacker_prefixes(&self) -> Vec<Ipv4Net> {
        match self {
            Self::SubprefixHijack | Self::UnannouncedSubprefixHijack => vec![*SUBPREFIX],
            Self::PrefixHijack | Self::UnannouncedPrefixHijack | Self::RouteLeak => {
                vec![*VICTIM_PREFIX]
            }
            Self::SuperprefixPrefixHijack => vec![*SUPERPREFIX, *VICTIM_PREFIX],
            Self::UnannouncedSuperprefixHijack => vec![*SUPERPREFIX],
        }
    }

    /// Whether the attacker keeps the victim as the origin of its announcements.
    pub fn keeps_origin(&self) -> bool {
        matches!(self, Self::RouteLeak)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
/// Defense policy run by all adopters of a trial.
pub enum Policy {
    /// Plain BGP, no defense.
    #[serde(rename = "bgp")]
    #[strum(serialize = "bgp")]
    Bgp,
    /// Route origin validation, dropping invalid announcements.
    #[serde(rename = "rov")]
    #[strum(serialize = "rov")]
    Rov,
    /// ROV++, avoiding next-hops that hold invalid more specific routes.
    #[serde(rename = "rovpp")]
    #[strum(serialize = "rovpp")]
    Rovpp,
    /// ROV++ additionally blackholing invalid more specific prefixes.
    #[serde(rename = "rovpp_bh")]
    #[strum(serialize = "rovpp_bh")]
    RovppBlackhole,
    /// ROV++ with blackholes, additionally announcing preventive more specific routes.
    #[serde(rename = "rovpp_bp")]
    #[strum(serialize = "rovpp_bp")]
    RovppPreventive,
}

/// Which party an announcement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    Attacker,
    Victim,
}

impl Role {
    /// Sentinel written by the engine at the AS that originates the announcement.
    pub fn terminal(&self) -> TerminalCondition {
        match self {
            Self::Attacker => TerminalCondition::Hijacked,
            Self::Victim => TerminalCondition::NotHijacked,
        }
    }
}

/// A seeded announcement of the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Announcement {
    /// AS that announces the prefix.
    pub asn: Asn,
    pub prefix: Ipv4Net,
    /// Origin carried in the AS path.
    pub origin: Asn,
    pub role: Role,
}

impl From<&Announcement> for AnnouncementRow {
    fn from(ann: &Announcement) -> Self {
        Self {
            asn: ann.asn,
            prefix: ann.prefix.to_string(),
            origin: ann.origin,
            received_from_asn: ann.role.terminal().sentinel(),
        }
    }
}

/// The announced inputs of one trial. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Scenario {
    attack_type: AttackType,
    attacker: Asn,
    victim: Asn,
    announcements: Vec<Announcement>,
}

impl Scenario {
    pub fn new(attack_type: AttackType, attacker: Asn, victim: Asn) -> Self {
        let mut announcements = Vec::new();
        if attack_type.victim_announces() {
            announcements.push(Announcement {
                asn: victim,
                prefix: *VICTIM_PREFIX,
                origin: victim,
                role: Role::Victim,
            });
        }
        let origin = if attack_type.keeps_origin() {
            victim
        } else {
            attacker
        };
        announcements.extend(
            attack_type
                .attacker_prefixes()
                .into_iter()
                .map(|prefix| Announcement {
                    asn: attacker,
                    prefix,
                    origin,
                    role: Role::Attacker,
                }),
        );
        Self {
            attack_type,
            attacker,
            victim,
            announcements,
        }
    }

    pub fn attack_type(&self) -> AttackType {
        self.attack_type
    }

    pub fn attacker(&self) -> Asn {
        self.attacker
    }

    pub fn victim(&self) -> Asn {
        self.victim
    }

    pub fn announcements(&self) -> &[Announcement] {
        &self.announcements
    }

    pub fn destination(&self) -> Ipv4Addr {
        DESTINATION
    }

    pub fn attacker_prefixes(&self) -> impl Iterator<Item = Ipv4Net> + '_ {
        self.by_role(Role::Attacker).map(|a| a.prefix)
    }

    pub fn victim_prefixes(&self) -> impl Iterator<Item = Ipv4Net> + '_ {
        self.by_role(Role::Victim).map(|a| a.prefix)
    }

    fn by_role(&self, role: Role) -> impl Iterator<Item = &Announcement> + '_ {
        self.announcements.iter().filter(move |a| a.role == role)
    }

    /// Whether the (prefix, origin) pair is announced by the attacker and cannot be told apart from
    /// the victim's announcement. A route leak keeps the victim's origin and is never matched.
    pub fn is_attacker_pair(&self, prefix: &Ipv4Net, origin: Asn) -> bool {
        self.matches(Role::Attacker, prefix, origin) && !self.matches(Role::Victim, prefix, origin)
    }

    /// Whether the (prefix, origin) pair is announced by the victim.
    pub fn is_victim_pair(&self, prefix: &Ipv4Net, origin: Asn) -> bool {
        self.matches(Role::Victim, prefix, origin)
    }

    fn matches(&self, role: Role, prefix: &Ipv4Net, origin: Asn) -> bool {
        self.by_role(role)
            .any(|a| a.prefix == *prefix && a.origin == origin)
    }

    /// Whether the AS is one of the two parties, which never count as observers.
    pub fn is_party(&self, asn: Asn) -> bool {
        asn == self.attacker || asn == self.victim
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (attacker AS{}, victim AS{})",
            self.attack_type, self.attacker, self.victim
        )
    }
}

/// Error thrown when the scenario could not be generated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("There is no AS to choose the attacker from")]
    NoAttacker,
    #[error("There is no AS to choose the victim from, other than the attacker AS{0}")]
    NoVictim(Asn),
    #[error("Attacker and victim must be different ASes, but both are AS{0}")]
    SameParty(Asn),
}

/// Picks attacker and victim for a trial.
#[derive(Debug, Clone, Default)]
pub struct ScenarioGenerator {
    pub attacker_pool: Vec<Asn>,
    pub victim_pool: Vec<Asn>,
    /// Always use this attacker instead of sampling one.
    pub attacker: Option<Asn>,
    /// Always use this victim instead of sampling one.
    pub victim: Option<Asn>,
}

impl ScenarioGenerator {
    pub fn new(attacker_pool: Vec<Asn>, victim_pool: Vec<Asn>) -> Self {
        Self {
            attacker_pool,
            victim_pool,
            attacker: None,
            victim: None,
        }
    }

    pub fn with_parties(mut self, attacker: Option<Asn>, victim: Option<Asn>) -> Self {
        self.attacker = attacker;
        self.victim = victim;
        self
    }

    /// Pick an attacker and a distinct victim uniformly at random from their pools.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        attack_type: AttackType,
        rng: &mut R,
    ) -> Result<Scenario, ScenarioError> {
        let attacker = match self.attacker {
            Some(asn) => asn,
            None => *self
                .attacker_pool
                .choose(rng)
                .ok_or(ScenarioError::NoAttacker)?,
        };
        let victim = match self.victim {
            Some(asn) if asn == attacker => return Err(ScenarioError::SameParty(asn)),
            Some(asn) => asn,
            None => {
                let candidates: Vec<Asn> = self
                    .victim_pool
                    .iter()
                    .copied()
                    .filter(|asn| *asn != attacker)
                    .collect();
                *candidates
                    .choose(rng)
                    .ok_or(ScenarioError::NoVictim(attacker))?
            }
        };
        Ok(Scenario::new(attack_type, attacker, victim))
    }
}
