//! Remark sentiment scoring
//!
//! [`LexiconScorer`] counts substring hits from positive/negative word lists.
//! [`KeywordScorer`] is the fallback used when no lexicon could be loaded.
//! Both sit behind [`SentimentScorer`] so the pipeline never checks which one
//! is active.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::SentimentLabel;
use crate::text;

pub trait SentimentScorer {
    /// Scorer name for logging
    fn name(&self) -> &'static str;

    fn score(&self, text: &str) -> SentimentLabel;
}

/// Sentiment of one remark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentEntry {
    #[serde(serialize_with = "text::serialize_clean")]
    pub remark: String,
    pub sentiment: SentimentLabel,
    pub score: f64,
}

impl SentimentEntry {
    pub fn new(remark: impl Into<String>, sentiment: SentimentLabel) -> Self {
        Self {
            remark: remark.into(),
            sentiment,
            score: sentiment.score(),
        }
    }
}

/// Positive and negative word lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(default)]
    pub positive: BTreeSet<String>,
    #[serde(default)]
    pub negative: BTreeSet<String>,
}

impl Lexicon {
    pub fn new<I, J, S, T>(positive: I, negative: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            positive: positive.into_iter().map(Into::into).collect(),
            negative: negative.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `{"positive": [...], "negative": [...]}`
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut lexicon: Lexicon = serde_json::from_str(content)
            .map_err(|e| Error::Lexicon(format!("Invalid lexicon JSON: {}", e)))?;
        // An empty word would match every remark
        lexicon.positive.retain(|w| !w.is_empty());
        lexicon.negative.retain(|w| !w.is_empty());
        Ok(lexicon)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Lexicon(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

/// Net count of lexicon hits decides the label
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: Lexicon,
}

impl LexiconScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Positive hits minus negative hits; each word counts at most once
    pub fn net_score(&self, text: &str) -> i64 {
        let hits = |words: &BTreeSet<String>| {
            words.iter().filter(|w| text.contains(w.as_str())).count() as i64
        };
        hits(&self.lexicon.positive) - hits(&self.lexicon.negative)
    }
}

impl SentimentScorer for LexiconScorer {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn score(&self, text: &str) -> SentimentLabel {
        match self.net_score(text) {
            n if n > 0 => SentimentLabel::Positive,
            n if n < 0 => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }
}

/// Fallback keyword heuristic
///
/// Any negative marker wins over positive ones.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    negative: Vec<String>,
    positive: Vec<String>,
}

impl KeywordScorer {
    pub fn new(negative: Vec<String>, positive: Vec<String>) -> Self {
        Self {
            negative: negative.into_iter().filter(|w| !w.is_empty()).collect(),
            positive: positive.into_iter().filter(|w| !w.is_empty()).collect(),
        }
    }

    /// Add one more negative marker (e.g. the blacklist label)
    pub fn with_negative_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !marker.is_empty() && !self.negative.contains(&marker) {
            self.negative.push(marker);
        }
        self
    }
}

impl SentimentScorer for KeywordScorer {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn score(&self, text: &str) -> SentimentLabel {
        if self.negative.iter().any(|w| text.contains(w.as_str())) {
            SentimentLabel::Negative
        } else if self.positive.iter().any(|w| text.contains(w.as_str())) {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// Score every remark with the given scorer, in input order
pub fn score_all<'a, I>(scorer: &dyn SentimentScorer, remarks: I) -> Vec<SentimentEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    remarks
        .into_iter()
        .map(|remark| SentimentEntry::new(remark, scorer.score(remark)))
        .collect()
}
