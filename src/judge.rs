//! Enveloppe-contribution judge (§4.4, C4).
//!
//! Only invoked once a species' representative set is full. Decides whether
//! an incoming genome should bump one of the current representatives, and
//! if so which one.

use crate::repset::RepresentativeSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JudgeRule {
    MaxAverage,
    MaxMinDistance,
    MaxMeanMinStdDev,
    WeightedDistanceToMean,
}

impl Default for JudgeRule {
    fn default() -> Self {
        JudgeRule::MaxAverage
    }
}

/// Verdict of an enveloppe-contribution judgement: whether the incoming
/// genome should replace the representative at index `than`, and the
/// confidence score behind that call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub better: bool,
    pub than: usize,
    pub value: f64,
}

/// Evaluates whether the genome whose distances-to-each-representative are
/// `gdist` should bump a member of `edist` (the species' current
/// `k*(k-1)/2` distance map, keyed `(min, max)`).
pub fn judge(
    rule: JudgeRule,
    edist: &BTreeMap<(usize, usize), f64>,
    gdist: &[f64],
) -> Contribution {
    let k = gdist.len();
    debug_assert!(k > 0, "judge called on an empty representative set");

    match rule {
        JudgeRule::MaxAverage => max_average(edist, gdist, k),
        JudgeRule::MaxMinDistance => max_min_distance(edist, gdist, k),
        JudgeRule::MaxMeanMinStdDev => max_mean_min_stddev(edist, gdist, k),
        JudgeRule::WeightedDistanceToMean => weighted_distance_to_mean(edist, gdist, k),
    }
}

#[inline]
fn e(edist: &BTreeMap<(usize, usize), f64>, i: usize, j: usize) -> f64 {
    let key = if i < j { (i, j) } else { (j, i) };
    edist[&key]
}

fn best(values: impl Iterator<Item = f64>) -> (usize, f64) {
    let mut best_i = 0;
    let mut best_v = f64::MIN;
    for (i, v) in values.enumerate() {
        if best_v < v {
            best_v = v;
            best_i = i;
        }
    }
    (best_i, best_v)
}

fn max_average(edist: &BTreeMap<(usize, usize), f64>, gdist: &[f64], k: usize) -> Contribution {
    let (than, value) = best((0..k).map(|i| {
        (0..k)
            .filter(|&j| j != i)
            .map(|j| -e(edist, i, j) + gdist[j])
            .sum()
    }));
    Contribution {
        better: value > 0.0,
        than,
        value,
    }
}

fn max_min_distance(edist: &BTreeMap<(usize, usize), f64>, gdist: &[f64], k: usize) -> Contribution {
    let (than, value) = best((0..k).map(|i| {
        let min_base = (0..k)
            .filter(|&j| j != i)
            .map(|j| e(edist, i, j))
            .fold(f64::MAX, f64::min);
        let min_new = (0..k)
            .filter(|&j| j != i)
            .map(|j| gdist[j])
            .fold(f64::MAX, f64::min);
        -min_base + min_new
    }));
    Contribution {
        better: value > 0.0,
        than,
        value,
    }
}

fn mean_and_stddev(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count().max(1) as f64;
    let mean = values.clone().sum::<f64>() / n;
    let variance = values.map(|v| (mean - v).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn max_mean_min_stddev(
    edist: &BTreeMap<(usize, usize), f64>,
    gdist: &[f64],
    k: usize,
) -> Contribution {
    let (base_mean, base_stddev) = mean_and_stddev(edist.values().copied());

    let (than, value) = best((0..k).map(|i| {
        let new_map: BTreeMap<(usize, usize), f64> = edist
            .iter()
            .map(|(&(a, b), &d)| {
                if a == i || b == i {
                    let other = if a == i { b } else { a };
                    ((a, b), gdist[other])
                } else {
                    ((a, b), d)
                }
            })
            .collect();
        let (new_mean, new_stddev) = mean_and_stddev(new_map.values().copied());
        (new_mean - base_mean) + (base_stddev - new_stddev)
    }));
    Contribution {
        better: value > 0.0,
        than,
        value,
    }
}

fn weighted_distance_to_mean(
    edist: &BTreeMap<(usize, usize), f64>,
    gdist: &[f64],
    k: usize,
) -> Contribution {
    let global_mean = edist.values().sum::<f64>() / edist.len().max(1) as f64;
    let sigma = (global_mean / 4.0).max(f64::EPSILON);
    let weight = |d: f64| 1.0 - (-(d - global_mean).powi(2) / (2.0 * sigma * sigma)).exp();

    let (than, value) = best((0..k).map(|i| {
        let mut baseline: Vec<f64> = (0..k).filter(|&j| j != i).map(|j| e(edist, i, j)).collect();
        let mut candidate: Vec<f64> = (0..k).filter(|&j| j != i).map(|j| gdist[j]).collect();
        baseline.sort_by(|a, b| b.partial_cmp(a).unwrap());
        candidate.sort_by(|a, b| b.partial_cmp(a).unwrap());

        baseline
            .iter()
            .zip(candidate.iter())
            .map(|(&nc_base, &pc)| {
                let nc = -nc_base;
                weight(pc) * (nc + pc)
            })
            .sum()
    }));
    Contribution {
        better: value > 0.0,
        than,
        value,
    }
}

/// Convenience wrapper that pulls `edist`/`gdist` straight out of a
/// representative set and a fresh genome's distance vector.
pub fn judge_against_set<G, U>(
    rule: JudgeRule,
    set: &RepresentativeSet<G, U>,
    gdist: &[f64],
) -> Contribution
where
    G: crate::genome::Genome,
    U: crate::repset::UserData,
{
    judge(rule, set.distance_map(), gdist)
}
