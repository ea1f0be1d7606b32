//! Frequent-pattern mining with Apriori
//!
//! Transactions are sets of category labels, one per time bucket (by default
//! one calendar day). Mining runs level-wise:
//!
//! 1. Count single items and keep the frequent ones
//! 2. Join frequent (k-1)-itemsets sharing a (k-2)-prefix into k-candidates,
//!    pruning any candidate with an infrequent (k-1)-subset
//! 3. Count candidate support in one scan per level
//! 4. Split every frequent itemset of size >= 2 into antecedent/consequent
//!    rules and keep those meeting the confidence threshold
//!
//! Itemsets are sorted `Vec<String>`s and all bookkeeping uses ordered maps,
//! so output order is stable for a given input.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::TransactionRecord;
use crate::text;

/// Support values at or below this are treated as zero when computing lift
const SUPPORT_EPSILON: f64 = 1e-9;

/// Splits are enumerated with a bitmask
const MAX_RULE_ITEMS: usize = 63;

/// A sorted set of items
pub type Itemset = Vec<String>;

/// A frequent itemset with its absolute support count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentItemset {
    pub items: Itemset,
    pub support_count: usize,
}

/// An association rule `antecedent => consequent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    #[serde(rename = "lhs", serialize_with = "text::serialize_clean_vec")]
    pub antecedent: Itemset,
    #[serde(rename = "rhs", serialize_with = "text::serialize_clean_vec")]
    pub consequent: Itemset,
    /// Share of transactions containing antecedent and consequent together
    pub support: f64,
    /// support(itemset) / support(antecedent)
    pub confidence: f64,
    /// confidence / support(consequent), 0 when the consequent never occurs
    pub lift: f64,
}

/// Apriori thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AprioriConfig {
    /// Minimum support as a fraction of transactions, in (0, 1)
    pub min_support: f64,
    /// Minimum confidence, in (0, 1]
    pub min_confidence: f64,
}

impl Default for AprioriConfig {
    fn default() -> Self {
        Self {
            min_support: 0.1,
            min_confidence: 0.5,
        }
    }
}

impl AprioriConfig {
    fn is_valid(&self) -> bool {
        self.min_support > 0.0
            && self.min_support < 1.0
            && self.min_confidence > 0.0
            && self.min_confidence <= 1.0
    }
}

/// Result of a mining run
#[derive(Debug, Clone, Default)]
pub struct MiningResult {
    pub transaction_count: usize,
    /// Every frequent itemset (all sizes) with its support count
    pub frequent: BTreeMap<Itemset, usize>,
    pub rules: Vec<AssociationRule>,
}

impl MiningResult {
    /// Frequent itemsets ordered by size, then lexicographically
    pub fn itemsets(&self) -> Vec<FrequentItemset> {
        let mut sets: Vec<FrequentItemset> = self
            .frequent
            .iter()
            .map(|(items, &support_count)| FrequentItemset {
                items: items.clone(),
                support_count,
            })
            .collect();
        sets.sort_by(|a, b| {
            a.items
                .len()
                .cmp(&b.items.len())
                .then_with(|| a.items.cmp(&b.items))
        });
        sets
    }

    /// Support of an itemset as a fraction of transactions
    pub fn support(&self, items: &[String]) -> Option<f64> {
        if self.transaction_count == 0 {
            return None;
        }
        self.frequent
            .get(items)
            .map(|&count| count as f64 / self.transaction_count as f64)
    }
}

/// Level-wise Apriori miner
#[derive(Debug, Clone, Copy, Default)]
pub struct Apriori {
    config: AprioriConfig,
}

impl Apriori {
    pub fn new(config: AprioriConfig) -> Self {
        Self { config }
    }

    /// Mine frequent itemsets and association rules
    ///
    /// Transactions are deduplicated and sorted before counting. Degenerate
    /// thresholds or empty input produce an empty result.
    pub fn mine(&self, transactions: &[Vec<String>]) -> MiningResult {
        if transactions.is_empty() {
            return MiningResult::default();
        }
        if !self.config.is_valid() {
            warn!(
                min_support = self.config.min_support,
                min_confidence = self.config.min_confidence,
                "Apriori thresholds out of range, skipping rule mining"
            );
            return MiningResult {
                transaction_count: transactions.len(),
                ..Default::default()
            };
        }

        let baskets: Vec<BTreeSet<&str>> = transactions
            .iter()
            .map(|t| t.iter().map(String::as_str).collect())
            .collect();
        let n = baskets.len();

        let mut frequent: BTreeMap<Itemset, usize> = BTreeMap::new();
        let mut level = self.frequent_singletons(&baskets);
        let mut k = 1;

        while !level.is_empty() {
            debug!(k, count = level.len(), "Frequent itemsets at level");
            frequent.extend(level.iter().map(|(set, &count)| (set.clone(), count)));

            let candidates = generate_candidates(&level);
            if candidates.is_empty() {
                break;
            }
            level = count_support(&candidates, &baskets)
                .into_iter()
                .filter(|(_, count)| self.meets_support(*count, n))
                .collect();
            k += 1;
        }

        let rules = self.derive_rules(&frequent, &baskets);
        debug!(
            transactions = n,
            itemsets = frequent.len(),
            rules = rules.len(),
            "Apriori mining complete"
        );

        MiningResult {
            transaction_count: n,
            frequent,
            rules,
        }
    }

    /// Mine and return only the rules
    pub fn rules(&self, transactions: &[Vec<String>]) -> Vec<AssociationRule> {
        self.mine(transactions).rules
    }

    fn meets_support(&self, count: usize, n: usize) -> bool {
        count as f64 / n as f64 >= self.config.min_support
    }

    fn frequent_singletons(&self, baskets: &[BTreeSet<&str>]) -> BTreeMap<Itemset, usize> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for basket in baskets {
            for &item in basket {
                *counts.entry(item).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, count)| self.meets_support(*count, baskets.len()))
            .map(|(item, count)| (vec![item.to_string()], count))
            .collect()
    }

    fn derive_rules(
        &self,
        frequent: &BTreeMap<Itemset, usize>,
        baskets: &[BTreeSet<&str>],
    ) -> Vec<AssociationRule> {
        let n = baskets.len() as f64;
        let mut rules = Vec::new();

        for (itemset, &itemset_count) in frequent.iter().filter(|(s, _)| s.len() >= 2) {
            if itemset.len() > MAX_RULE_ITEMS {
                warn!(size = itemset.len(), "Itemset too large for rule enumeration");
                continue;
            }

            let splits: u64 = (1u64 << itemset.len()) - 1;
            for mask in 1..splits {
                let (antecedent, consequent) = split_itemset(itemset, mask);

                let antecedent_count = support_count(frequent, baskets, &antecedent);
                if antecedent_count == 0 {
                    continue;
                }
                let confidence = itemset_count as f64 / antecedent_count as f64;
                if confidence < self.config.min_confidence {
                    continue;
                }

                let consequent_support = support_count(frequent, baskets, &consequent) as f64 / n;
                let lift = if consequent_support > SUPPORT_EPSILON {
                    confidence / consequent_support
                } else {
                    0.0
                };

                rules.push(AssociationRule {
                    antecedent,
                    consequent,
                    support: itemset_count as f64 / n,
                    confidence,
                    lift,
                });
            }
        }

        rules
    }
}

/// Split a sorted itemset by bitmask: set bits go to the antecedent
fn split_itemset(itemset: &[String], mask: u64) -> (Itemset, Itemset) {
    let mut antecedent = Vec::new();
    let mut consequent = Vec::new();
    for (j, item) in itemset.iter().enumerate() {
        if (mask >> j) & 1 == 1 {
            antecedent.push(item.clone());
        } else {
            consequent.push(item.clone());
        }
    }
    (antecedent, consequent)
}

/// Ordered join of frequent (k-1)-itemsets plus subset pruning
fn generate_candidates(level: &BTreeMap<Itemset, usize>) -> BTreeSet<Itemset> {
    let prev: Vec<&Itemset> = level.keys().collect();
    let mut candidates = BTreeSet::new();

    for (i, a) in prev.iter().enumerate() {
        for b in &prev[i + 1..] {
            let prefix_len = a.len() - 1;
            if a[..prefix_len] != b[..prefix_len] {
                // Keys are sorted, so no later itemset shares this prefix
                break;
            }
            if a[prefix_len] >= b[prefix_len] {
                continue;
            }

            let mut candidate = (*a).clone();
            candidate.push(b[prefix_len].clone());
            if all_subsets_frequent(&candidate, level) {
                candidates.insert(candidate);
            }
        }
    }

    candidates
}

fn all_subsets_frequent(candidate: &[String], level: &BTreeMap<Itemset, usize>) -> bool {
    (0..candidate.len()).all(|skip| {
        let subset: Itemset = candidate
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != skip)
            .map(|(_, item)| item.clone())
            .collect();
        level.contains_key(&subset)
    })
}

fn contains_all(basket: &BTreeSet<&str>, items: &[String]) -> bool {
    items.iter().all(|item| basket.contains(item.as_str()))
}

fn count_support(
    candidates: &BTreeSet<Itemset>,
    baskets: &[BTreeSet<&str>],
) -> BTreeMap<Itemset, usize> {
    let mut counts: BTreeMap<Itemset, usize> = BTreeMap::new();
    for basket in baskets {
        for candidate in candidates {
            if contains_all(basket, candidate) {
                *counts.entry(candidate.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Support count from the frequent table, scanning transactions if absent
fn support_count(
    frequent: &BTreeMap<Itemset, usize>,
    baskets: &[BTreeSet<&str>],
    items: &[String],
) -> usize {
    match frequent.get(items) {
        Some(&count) => count,
        None => baskets.iter().filter(|b| contains_all(b, items)).count(),
    }
}

/// One transaction per calendar day: the sorted, deduplicated categories seen that day
pub fn daily_transactions(records: &[TransactionRecord]) -> Vec<Vec<String>> {
    let mut by_day: BTreeMap<chrono::NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    for r in records {
        by_day.entry(r.date).or_default().insert(r.category.as_str());
    }
    by_day
        .into_values()
        .map(|items| items.into_iter().map(str::to_string).collect())
        .collect()
}
