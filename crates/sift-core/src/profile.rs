//! Per-entity profiles
//!
//! One pass over the records accumulates named numeric features per entity:
//! gift counterparties found in remarks, the blacklist and imported buckets,
//! and one profile per category. Averages are filled in once at the end.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::labels::{self, LabelLookup};
use crate::models::TransactionRecord;
use crate::text;

pub const FEATURE_COUNT: &str = "count";
pub const FEATURE_TOTAL: &str = "total_amount";
pub const FEATURE_AVG: &str = "avg_amount";
pub const FEATURE_GIFT: &str = "gift_amount";

/// What a profile describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Gift,
    Blacklist,
    Imported,
    Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(serialize_with = "text::serialize_clean")]
    pub user_id: String,
    pub kind: ProfileKind,
    #[serde(serialize_with = "text::serialize_clean")]
    pub label: String,
    pub features: BTreeMap<String, f64>,
}

impl Profile {
    fn new(kind: ProfileKind, user_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            label: label.into(),
            features: BTreeMap::new(),
        }
    }

    fn add(&mut self, feature: &str, value: f64) {
        *self.features.entry(feature.to_string()).or_insert(0.0) += value;
    }

    fn record(&mut self, amount: f64) {
        self.add(FEATURE_COUNT, 1.0);
        self.add(FEATURE_TOTAL, amount);
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

type ProfileMap = BTreeMap<(ProfileKind, String), Profile>;

fn entry<'m>(
    profiles: &'m mut ProfileMap,
    kind: ProfileKind,
    id: &str,
    label: String,
) -> &'m mut Profile {
    profiles
        .entry((kind, id.to_string()))
        .or_insert_with(|| Profile::new(kind, id, label))
}

pub struct ProfileBuilder<'a> {
    labels: &'a dyn LabelLookup,
    gift_name_chars: usize,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(labels: &'a dyn LabelLookup, gift_name_chars: usize) -> Self {
        Self {
            labels,
            gift_name_chars,
        }
    }

    /// Counterparty named right after the gift marker, if any
    fn gift_counterparty(&self, remark: &str, marker: &str) -> Option<String> {
        if marker.is_empty() || self.gift_name_chars == 0 {
            return None;
        }
        let pos = remark.find(marker)?;
        let name: String = remark[pos + marker.len()..]
            .chars()
            .take(self.gift_name_chars)
            .collect();
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Build profiles ordered by kind, then entity id
    pub fn build(&self, records: &[TransactionRecord]) -> Vec<Profile> {
        let gift_marker = self.labels.label(labels::GIFT);
        let blacklist_marker = self.labels.label(labels::BLACKLIST);
        let category_prefix = self.labels.label(labels::PROFILE_CATEGORY);

        let mut profiles: ProfileMap = BTreeMap::new();

        for record in records {
            if let Some(user) = self.gift_counterparty(&record.remark, &gift_marker) {
                let label = self.labels.label(labels::PROFILE_GIFT);
                entry(&mut profiles, ProfileKind::Gift, &user, label)
                    .add(FEATURE_GIFT, record.amount);
            }

            if record.is_blacklist
                || (!blacklist_marker.is_empty() && record.remark.contains(&blacklist_marker))
            {
                let label = self.labels.label(labels::PROFILE_BLACKLIST);
                entry(&mut profiles, ProfileKind::Blacklist, "blacklist", label)
                    .record(record.amount);
            }

            if record.is_imported {
                let label = self.labels.label(labels::PROFILE_IMPORTED);
                entry(&mut profiles, ProfileKind::Imported, "imported", label)
                    .record(record.amount);
            }

            let label = format!("{}{}", category_prefix, record.category);
            entry(&mut profiles, ProfileKind::Category, &record.category, label)
                .record(record.amount);
        }

        let mut built: Vec<Profile> = profiles.into_values().collect();
        for profile in &mut built {
            if let (Some(count), Some(total)) =
                (profile.feature(FEATURE_COUNT), profile.feature(FEATURE_TOTAL))
            {
                if count > 0.0 {
                    profile.features.insert(FEATURE_AVG.to_string(), total / count);
                }
            }
        }

        debug!(profiles = built.len(), "Built profiles");
        built
    }
}
