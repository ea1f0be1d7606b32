//! Label lookup
//!
//! The pipeline asks a [`LabelLookup`] for two things only: which marker
//! substrings to search remarks for (blacklist, gift, imported) and what to
//! call a bucket (cluster and profile names). Translation itself lives
//! outside this crate; [`Labels`] is a flat key/value table loaded from JSON.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

pub const LANG_CODE: &str = "lang_code";
pub const CLUSTER_HIGH: &str = "cluster_high";
pub const CLUSTER_MID: &str = "cluster_mid";
pub const CLUSTER_LOW: &str = "cluster_low";
pub const BLACKLIST: &str = "blacklist";
pub const GIFT: &str = "gift";
pub const IMPORTED: &str = "imported";
pub const PROFILE_GIFT: &str = "profile_gift";
pub const PROFILE_BLACKLIST: &str = "profile_blacklist";
pub const PROFILE_IMPORTED: &str = "profile_imported";
pub const PROFILE_CATEGORY: &str = "profile_type";

pub trait LabelLookup {
    /// Resolve a label key. Unknown keys resolve to the key itself.
    fn label(&self, key: &str) -> String;
}

/// Flat label table
#[derive(Debug, Clone)]
pub struct Labels {
    entries: HashMap<String, String>,
}

impl Labels {
    /// Empty table: every key resolves to itself
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Parse a flat JSON object of key/value strings
    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    /// Load a label file, overlaying it on the defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let overrides = Self::from_json_str(&content)?;
        let mut labels = Self::default();
        labels.entries.extend(overrides.entries);
        Ok(labels)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl Default for Labels {
    fn default() -> Self {
        let entries = [
            (LANG_CODE, "zh_CN"),
            (CLUSTER_HIGH, "高消费群"),
            (CLUSTER_MID, "中等消费群"),
            (CLUSTER_LOW, "低消费群"),
            (BLACKLIST, "黑名单"),
            (GIFT, "送"),
            (IMPORTED, "进口"),
            (PROFILE_GIFT, "人情往来"),
            (PROFILE_BLACKLIST, "黑名单消费"),
            (PROFILE_IMPORTED, "进口商品消费"),
            (PROFILE_CATEGORY, "类别: "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { entries }
    }
}

impl LabelLookup for Labels {
    fn label(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_key_resolves_to_itself() {
        let labels = Labels::empty();
        assert_eq!(labels.label("cluster_high"), "cluster_high");
    }

    #[test]
    fn test_defaults_include_markers() {
        let labels = Labels::default();
        assert_eq!(labels.label(BLACKLIST), "黑名单");
        assert_eq!(labels.label(IMPORTED), "进口");
        assert_eq!(labels.label(LANG_CODE), "zh_CN");
    }

    #[test]
    fn test_load_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"lang_code": "en_US", "cluster_high": "High spenders"}}"#
        )
        .unwrap();

        let labels = Labels::load(file.path()).unwrap();
        assert_eq!(labels.label(LANG_CODE), "en_US");
        assert_eq!(labels.label(CLUSTER_HIGH), "High spenders");
        // Untouched keys keep their defaults
        assert_eq!(labels.label(BLACKLIST), "黑名单");
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Labels::from_json_str("[1, 2]").is_err());
    }
}
