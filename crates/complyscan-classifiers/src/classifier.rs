//! Classifier trait and common types

use async_trait::async_trait;
use complyscan_core::Result;
use serde::Serialize;

/// Number of categories returned per input
pub const DEFAULT_TOP_K: usize = 3;

/// Trait for all category classifiers
#[async_trait]
pub trait CategoryClassifier: Send + Sync {
    /// Rank the label set for `text`, best first
    ///
    /// Returns at most `top_k` categories. Empty text yields an empty ranking.
    /// Failures inside the forward pass are reported as
    /// [`complyscan_core::Error::Inference`].
    async fn classify(&self, text: &str) -> Result<Vec<RankedCategory>>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Labels in model output order
    fn labels(&self) -> &[String];
}

/// One entry of a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCategory {
    /// Index into the label set
    pub index: usize,

    /// Category name
    pub label: String,

    /// Model score for this label
    pub score: f32,
}

impl RankedCategory {
    pub fn new(index: usize, label: impl Into<String>, score: f32) -> Self {
        Self {
            index,
            label: label.into(),
            score,
        }
    }
}

/// Indices of the `k` highest scores, score-descending
///
/// Ties keep the lower index first. No threshold is applied and indices are
/// never repeated. The order is total, so NaN scores cannot break the sort.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);
    order
}

/// Build a ranking from a score vector aligned with `labels`
pub fn rank(scores: &[f32], labels: &[String], k: usize) -> Vec<RankedCategory> {
    top_k_indices(scores, k)
        .into_iter()
        .map(|idx| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("label_{}", idx));
            RankedCategory::new(idx, label, scores[idx])
        })
        .collect()
}
