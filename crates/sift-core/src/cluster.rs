//! Behavioral clustering of records by amount
//!
//! Two interchangeable strategies behind [`ClusterStrategy`]:
//! - [`KMeansClusterer`]: 1-D Lloyd's algorithm with an injected random source
//! - [`BandClusterer`]: deterministic mean +/- stddev banding into high/mid/low
//!
//! Both emit clusters ranked by average amount (rank 1 = highest) and named
//! "Cluster N"; semantic names are applied afterwards with [`apply_labels`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::labels::{self, LabelLookup};
use crate::models::TransactionRecord;
use crate::stats::Stats;
use crate::text;

/// A group of records, referenced by index into the input slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(serialize_with = "text::serialize_clean")]
    pub label: String,
    /// 1-based rank by average amount, highest first
    #[serde(skip)]
    pub rank: usize,
    pub member_indices: Vec<usize>,
    pub cluster_total: f64,
    pub avg_amount: f64,
    /// Whether any member is flagged blacklist
    #[serde(skip)]
    pub has_blacklist: bool,
}

impl Cluster {
    fn from_members(rank: usize, member_indices: Vec<usize>, records: &[TransactionRecord]) -> Self {
        let cluster_total: f64 = member_indices.iter().map(|&i| records[i].amount).sum();
        let avg_amount = if member_indices.is_empty() {
            0.0
        } else {
            cluster_total / member_indices.len() as f64
        };
        let has_blacklist = member_indices.iter().any(|&i| records[i].is_blacklist);

        Self {
            label: rank_label(rank),
            rank,
            member_indices,
            cluster_total,
            avg_amount,
            has_blacklist,
        }
    }
}

fn rank_label(rank: usize) -> String {
    format!("Cluster {}", rank)
}

/// A strategy that partitions records into clusters
pub trait ClusterStrategy {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    fn cluster(&mut self, records: &[TransactionRecord]) -> Vec<Cluster>;
}

/// 1-D k-means over record amounts
///
/// Empty clusters are kept with zero aggregates and ranked after the
/// populated ones.
pub struct KMeansClusterer<R: Rng> {
    k: usize,
    max_iterations: usize,
    rng: R,
}

impl<R: Rng> KMeansClusterer<R> {
    pub fn new(k: usize, max_iterations: usize, rng: R) -> Self {
        Self {
            k,
            max_iterations,
            rng,
        }
    }

    fn random_amount(&mut self, records: &[TransactionRecord]) -> f64 {
        records[self.rng.gen_range(0..records.len())].amount
    }
}

fn nearest_centroid(amount: f64, centroids: &[f64]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (j, &c) in centroids.iter().enumerate() {
        let dist = (amount - c).abs();
        if dist < best_dist {
            best_dist = dist;
            best = j;
        }
    }
    best
}

impl<R: Rng> ClusterStrategy for KMeansClusterer<R> {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn cluster(&mut self, records: &[TransactionRecord]) -> Vec<Cluster> {
        if records.is_empty() || self.k == 0 {
            return vec![];
        }

        let k = self.k;
        let mut centroids: Vec<f64> = (0..k).map(|_| self.random_amount(records)).collect();
        let mut assigned: Vec<Option<usize>> = vec![None; records.len()];
        let mut iterations = 0;

        // Assignment always runs at least once; `max_iterations` caps the
        // centroid updates in between.
        loop {
            let mut changed = false;
            for (i, r) in records.iter().enumerate() {
                let nearest = nearest_centroid(r.amount, &centroids);
                if assigned[i] != Some(nearest) {
                    assigned[i] = Some(nearest);
                    changed = true;
                }
            }
            if !changed || iterations >= self.max_iterations {
                break;
            }
            iterations += 1;

            let mut sums = vec![0.0; k];
            let mut counts = vec![0usize; k];
            for (i, slot) in assigned.iter().enumerate() {
                if let Some(c) = *slot {
                    sums[c] += records[i].amount;
                    counts[c] += 1;
                }
            }
            for j in 0..k {
                centroids[j] = if counts[j] > 0 {
                    sums[j] / counts[j] as f64
                } else {
                    self.random_amount(records)
                };
            }
        }

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (i, slot) in assigned.iter().enumerate() {
            if let Some(c) = *slot {
                members[c].push(i);
            }
        }

        let mut clusters: Vec<Cluster> = members
            .into_iter()
            .map(|m| Cluster::from_members(0, m, records))
            .collect();
        // Empty clusters rank last whatever the sign of the amounts
        clusters.sort_by(|a, b| {
            a.member_indices
                .is_empty()
                .cmp(&b.member_indices.is_empty())
                .then_with(|| b.avg_amount.total_cmp(&a.avg_amount))
        });
        for (i, cluster) in clusters.iter_mut().enumerate() {
            cluster.rank = i + 1;
            cluster.label = rank_label(cluster.rank);
        }

        debug!(k, iterations, "k-means clustering finished");
        clusters
    }
}

/// Fixed three-band classification around the mean
///
/// high: amount > mean + stddev, low: amount < mean - stddev, mid otherwise.
/// Empty bands are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandClusterer;

impl BandClusterer {
    pub fn new() -> Self {
        Self
    }
}

impl ClusterStrategy for BandClusterer {
    fn name(&self) -> &'static str {
        "banding"
    }

    fn cluster(&mut self, records: &[TransactionRecord]) -> Vec<Cluster> {
        if records.is_empty() {
            return vec![];
        }

        let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
        let stats = Stats::from_values(&amounts);
        let upper = stats.mean + stats.std_dev;
        let lower = stats.mean - stats.std_dev;

        let mut bands: [Vec<usize>; 3] = Default::default();
        for (i, r) in records.iter().enumerate() {
            let band = if r.amount > upper {
                0
            } else if r.amount < lower {
                2
            } else {
                1
            };
            bands[band].push(i);
        }

        bands
            .into_iter()
            .enumerate()
            .filter(|(_, members)| !members.is_empty())
            .map(|(i, members)| Cluster::from_members(i + 1, members, records))
            .collect()
    }
}

/// Rename ranked clusters with semantic labels
///
/// Ranks 1-3 map to the high/mid/low names; other ranks keep "Cluster N".
/// Clusters containing blacklisted records get the blacklist marker appended.
pub fn apply_labels(clusters: &mut [Cluster], lookup: &dyn LabelLookup) {
    for cluster in clusters.iter_mut() {
        let name = match cluster.rank {
            1 => lookup.label(labels::CLUSTER_HIGH),
            2 => lookup.label(labels::CLUSTER_MID),
            3 => lookup.label(labels::CLUSTER_LOW),
            _ => rank_label(cluster.rank),
        };
        cluster.label = if cluster.has_blacklist {
            format!("{} ({})", name, lookup.label(labels::BLACKLIST))
        } else {
            name
        };
    }
}
