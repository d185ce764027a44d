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

//! Aggregate the trial results of one (cohort, attack type, policy, percentage) into means and 95%
//! confidence intervals.
//!
//! Every metric is a fraction `numerator / denominator` computed per trial. Trials with a zero
//! denominator contribute no sample for that metric, so the number of samples may differ between
//! metrics. A requested metric without any sample is a fatal error.
use std::{collections::BTreeMap, fmt};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::{
    analyzer::TrialResult,
    experiments::scenarios::{AttackType, Policy},
    records::{AdopterClass, TerminalCondition},
};

/// Z-score of the two-sided 95% confidence interval.
pub const Z_95: f64 = 1.96;

/// Error thrown when the trial results cannot be aggregated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("No trial of {key} contributes a sample to {metric}")]
    Gap { key: AggregateKey, metric: Metric },
    #[error("No trial results to aggregate for {0}")]
    NoTrials(AggregateKey),
    #[error("Trial {trial} of cohort {cohort} does not belong to {key}")]
    MixedKeys {
        key: AggregateKey,
        cohort: String,
        trial: String,
    },
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
/// Quantity measured per trial.
pub enum MetricKind {
    /// Traced observers whose traffic reaches the attacker.
    DataPlaneHijacked,
    /// Traced observers whose traffic reaches the victim.
    DataPlaneNotHijacked,
    /// Traced observers whose traffic is dropped.
    DataPlaneBlackholed,
    /// Observers whose RIB contains the attacker's announcement.
    ControlPlaneHijacked,
    /// Observers whose RIB only contains the victim's announcement.
    ControlPlaneNotHijacked,
    /// Observers whose RIB contains a blackhole.
    ControlPlaneBlackholed,
    /// Observers without any record.
    NoRib,
    VisibleHijacks,
    HiddenHijacks,
}

/// A metric is measured separately for adopting and collateral ASes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Metric {
    pub kind: MetricKind,
    pub class: AdopterClass,
}

impl Metric {
    pub fn new(kind: MetricKind, class: AdopterClass) -> Self {
        Self { kind, class }
    }

    /// Column name, e.g., `data_plane_hijacked_adopting`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.kind, self.class)
    }

    /// All metrics, in the order of the output columns.
    pub fn all() -> impl Iterator<Item = Metric> {
        MetricKind::iter()
            .cartesian_product(AdopterClass::ALL)
            .map(|(kind, class)| Self::new(kind, class))
    }

    /// `(numerator, denominator)` of the metric in a single trial. Every metric is a fraction of
    /// all observers of the class. Observers without a route are not traced, so they only show up
    /// in [`MetricKind::NoRib`], and the data-plane fractions of a class sum to `1 - no_rib`.
    pub fn sample(&self, result: &TrialResult) -> (usize, usize) {
        let class = self.class;
        let observers = result.observers[class];
        let cp = &result.control_plane[class];
        let numerator = match self.kind {
            MetricKind::DataPlaneHijacked => {
                result.data_plane.get(TerminalCondition::Hijacked, class)
            }
            MetricKind::DataPlaneNotHijacked => {
                result.data_plane.get(TerminalCondition::NotHijacked, class)
            }
            MetricKind::DataPlaneBlackholed => {
                result.data_plane.get(TerminalCondition::Blackholed, class)
            }
            MetricKind::ControlPlaneHijacked => cp.received_attacker,
            MetricKind::ControlPlaneNotHijacked => cp.victim_only,
            MetricKind::ControlPlaneBlackholed => cp.blackholed,
            MetricKind::NoRib => cp.no_rib,
            MetricKind::VisibleHijacks => result.visible_hijacks[class],
            MetricKind::HiddenHijacks => result.hidden_hijacks[class],
        };
        (numerator, observers)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Metrics that must be defined for the given trials. A class is only measured if at least one
/// trial has an observer of that class, e.g., there are no adopting metrics at 0% adoption (unless
/// the cohort has a minimum number of adopters), and no collateral metrics at 100%.
pub fn requested_metrics(results: &[TrialResult]) -> Vec<Metric> {
    Metric::all()
        .filter(|m| results.iter().any(|r| r.observers[m.class] > 0))
        .collect()
}

/// Key shared by all trial results that are aggregated together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct AggregateKey {
    pub cohort: String,
    pub attack_type: AttackType,
    pub policy: Policy,
    pub percent: u8,
}

impl AggregateKey {
    pub fn of(result: &TrialResult) -> Self {
        Self {
            cohort: result.cohort.clone(),
            attack_type: result.key.attack_type,
            policy: result.key.policy,
            percent: result.key.percent,
        }
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} {}%]",
            self.cohort, self.attack_type, self.policy, self.percent
        )
    }
}

/// Mean and 95% confidence half-width of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MetricStat {
    pub mean: f64,
    pub ci: f64,
    /// Number of contributing trials.
    pub n: usize,
}

/// Mean and confidence half-width `Z_95 * s / sqrt(n)` using the sample standard deviation. A
/// single sample has a half-width of zero. Returns `None` for an empty slice.
pub fn mean_and_ci(samples: &[f64]) -> Option<MetricStat> {
    let n = samples.len();
    if n == 0 {
        return None;
    }
    let mean = samples.iter().mean();
    let ci = if n == 1 {
        0.0
    } else {
        Z_95 * samples.iter().std_dev() / (n as f64).sqrt()
    };
    Some(MetricStat { mean, ci, n })
}

/// Aggregated statistic of one key. Metrics that were not requested are `None`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AggregateStatistic {
    pub key: AggregateKey,
    pub n_trials: usize,
    pub metrics: BTreeMap<Metric, Option<MetricStat>>,
}

impl AggregateStatistic {
    pub fn get(&self, metric: Metric) -> Option<&MetricStat> {
        self.metrics.get(&metric).and_then(Option::as_ref)
    }

    pub fn record_title() -> Vec<String> {
        ["cohort", "attack_type", "policy", "percent", "n_trials"]
            .into_iter()
            .map(String::from)
            .chain(Metric::all().flat_map(|m| [m.name(), format!("{}_ci", m.name())]))
            .collect()
    }

    pub fn record(&self) -> Vec<String> {
        let num = |x: Option<f64>| x.map(|x| format!("{x:.6}")).unwrap_or_default();
        [
            self.key.cohort.clone(),
            self.key.attack_type.to_string(),
            self.key.policy.to_string(),
            self.key.percent.to_string(),
            self.n_trials.to_string(),
        ]
        .into_iter()
        .chain(Metric::all().flat_map(|m| {
            let stat = self.get(m);
            [num(stat.map(|s| s.mean)), num(stat.map(|s| s.ci))]
        }))
        .collect()
    }
}

/// Aggregate all trial results of one key.
pub fn aggregate(
    key: &AggregateKey,
    results: &[TrialResult],
) -> Result<AggregateStatistic, AggregationError> {
    if results.is_empty() {
        return Err(AggregationError::NoTrials(key.clone()));
    }
    if let Some(r) = results.iter().find(|r| AggregateKey::of(r) != *key) {
        return Err(AggregationError::MixedKeys {
            key: key.clone(),
            cohort: r.cohort.clone(),
            trial: r.key.to_string(),
        });
    }

    let mut metrics: BTreeMap<Metric, Option<MetricStat>> =
        Metric::all().map(|m| (m, None)).collect();
    for metric in requested_metrics(results) {
        let samples: Vec<f64> = results
            .iter()
            .map(|r| metric.sample(r))
            .filter(|(_, den)| *den > 0)
            .map(|(num, den)| num as f64 / den as f64)
            .collect();
        let stat = mean_and_ci(&samples).ok_or_else(|| AggregationError::Gap {
            key: key.clone(),
            metric,
        })?;
        if stat.n == 1 && results.len() > 1 {
            log::warn!(
                "{key}: only a single trial contributes to {metric}, the confidence interval is 0"
            );
        }
        metrics.insert(metric, Some(stat));
    }

    Ok(AggregateStatistic {
        key: key.clone(),
        n_trials: results.len(),
        metrics,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        analyzer::{ControlPlaneCounts, CountMatrix},
        experiments::context::TrialKey,
        records::PerClass,
    };

    fn key(percent: u8) -> AggregateKey {
        AggregateKey {
            cohort: "edge".to_string(),
            attack_type: AttackType::SubprefixHijack,
            policy: Policy::Rov,
            percent,
        }
    }

    /// A trial result in which `hijacked` of `adopting` adopters and none of the collateral are
    /// hijacked.
    fn trial(trial: usize, percent: u8, adopting: usize, hijacked: usize) -> TrialResult {
        let mut data_plane = CountMatrix::default();
        for i in 0..adopting {
            let cond = if i < hijacked {
                TerminalCondition::Hijacked
            } else {
                TerminalCondition::NotHijacked
            };
            data_plane.add(cond, AdopterClass::Adopting);
        }
        for _ in 0..4 {
            data_plane.add(TerminalCondition::NotHijacked, AdopterClass::Collateral);
        }
        TrialResult {
            key: TrialKey::new(AttackType::SubprefixHijack, Policy::Rov, percent, trial),
            cohort: "edge".to_string(),
            observers: PerClass::new(adopting, 4),
            data_plane,
            control_plane: PerClass::<ControlPlaneCounts>::default(),
            visible_hijacks: PerClass::default(),
            hidden_hijacks: PerClass::new(hijacked, 0),
        }
    }

    fn hijacked_adopting() -> Metric {
        Metric::new(MetricKind::DataPlaneHijacked, AdopterClass::Adopting)
    }

    #[test]
    fn zero_variance() {
        let stat = mean_and_ci(&[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert_eq!(stat.mean, 0.5);
        assert_eq!(stat.ci, 0.0);
        assert_eq!(stat.n, 4);

        let results: Vec<_> = (0..4).map(|i| trial(i, 50, 2, 1)).collect();
        let agg = aggregate(&key(50), &results).unwrap();
        let stat = agg.get(hijacked_adopting()).unwrap();
        assert_eq!((stat.mean, stat.ci, stat.n), (0.5, 0.0, 4));
    }

    #[test]
    fn two_extremes() {
        let stat = mean_and_ci(&[0.0, 1.0]).unwrap();
        assert!((stat.mean - 0.5).abs() < 1e-12);
        let sd = (0.5f64).sqrt();
        assert!((stat.ci - Z_95 * sd / 2f64.sqrt()).abs() < 1e-9);
        assert!((stat.ci - 0.98).abs() < 1e-9);
    }

    #[test]
    fn single_sample_has_no_interval() {
        let stat = mean_and_ci(&[0.25]).unwrap();
        assert_eq!((stat.mean, stat.ci, stat.n), (0.25, 0.0, 1));
        assert_eq!(mean_and_ci(&[]), None);
    }

    #[test]
    fn zero_denominators_are_skipped() {
        // the second trial has no adopting observer
        let results = vec![trial(0, 10, 4, 1), trial(1, 10, 0, 0), trial(2, 10, 4, 3)];
        let agg = aggregate(&key(10), &results).unwrap();
        assert_eq!(agg.n_trials, 3);
        let stat = agg.get(hijacked_adopting()).unwrap();
        assert_eq!(stat.n, 2);
        assert!((stat.mean - 0.5).abs() < 1e-12);
        let collateral = agg
            .get(Metric::new(MetricKind::DataPlaneNotHijacked, AdopterClass::Collateral))
            .unwrap();
        assert_eq!((collateral.mean, collateral.n), (1.0, 3));
    }

    #[test]
    fn observers_without_a_route_are_not_hijacked() {
        // two adopting observers in every trial, but none of them holds a route
        let untraced = |i| {
            let mut r = trial(i, 10, 0, 0);
            r.observers.adopting = 2;
            r.control_plane.adopting.no_rib = 2;
            r
        };
        let results = vec![untraced(0), untraced(1)];
        let agg = aggregate(&key(10), &results).unwrap();
        let mean = |kind| agg.get(Metric::new(kind, AdopterClass::Adopting)).map(|s| s.mean);
        assert_eq!(mean(MetricKind::DataPlaneHijacked), Some(0.0));
        assert_eq!(mean(MetricKind::DataPlaneNotHijacked), Some(0.0));
        assert_eq!(mean(MetricKind::ControlPlaneHijacked), Some(0.0));
        assert_eq!(mean(MetricKind::HiddenHijacks), Some(0.0));
        assert_eq!(mean(MetricKind::NoRib), Some(1.0));
        assert_eq!(agg.get(hijacked_adopting()).map(|s| s.n), Some(2));

        assert_eq!(
            aggregate(&key(10), &[]),
            Err(AggregationError::NoTrials(key(10)))
        );
    }

    #[test]
    fn unrequested_metrics_stay_empty() {
        // nobody adopts at 0%
        let results = vec![trial(0, 0, 0, 0), trial(1, 0, 0, 0)];
        assert_eq!(requested_metrics(&results).len(), 9);
        let agg = aggregate(&key(0), &results).unwrap();
        assert_eq!(agg.get(hijacked_adopting()), None);
        assert!(agg
            .get(Metric::new(MetricKind::DataPlaneHijacked, AdopterClass::Collateral))
            .is_some());
        // the no-RIB metric is defined whenever there are observers
        assert_eq!(
            agg.get(Metric::new(MetricKind::NoRib, AdopterClass::Collateral))
                .map(|s| s.mean),
            Some(0.0)
        );

        let mut everyone = trial(0, 100, 3, 0);
        everyone.observers.collateral = 0;
        everyone.data_plane = CountMatrix::default();
        for _ in 0..3 {
            everyone
                .data_plane
                .add(TerminalCondition::NotHijacked, AdopterClass::Adopting);
        }
        assert!(requested_metrics(&[everyone])
            .iter()
            .all(|m| m.class == AdopterClass::Adopting));
    }

    #[test]
    fn mixed_keys_are_rejected() {
        let results = vec![trial(0, 10, 4, 1), trial(1, 20, 4, 1)];
        assert!(matches!(
            aggregate(&key(10), &results),
            Err(AggregationError::MixedKeys { .. })
        ));
    }

    #[test]
    fn records() {
        let results: Vec<_> = (0..4).map(|i| trial(i, 50, 2, 1)).collect();
        let agg = aggregate(&key(50), &results).unwrap();
        let title = AggregateStatistic::record_title();
        let record = agg.record();
        assert_eq!(title.len(), record.len());
        assert_eq!(title.len(), 5 + 2 * 18);
        assert_eq!(&title[..7], &[
            "cohort",
            "attack_type",
            "policy",
            "percent",
            "n_trials",
            "data_plane_hijacked_adopting",
            "data_plane_hijacked_adopting_ci",
        ]);
        assert_eq!(
            &record[..7],
            &["edge", "subprefix_hijack", "rov", "50", "4", "0.500000", "0.000000"]
        );
    }
}
