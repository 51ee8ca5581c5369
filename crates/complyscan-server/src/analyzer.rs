//! Analysis orchestration
//!
//! normalize -> store lookup -> classify under a deadline -> enrich from the
//! knowledge base -> record.

use complyscan_classifiers::{CategoryClassifier, RankedCategory};
use complyscan_core::{
    fingerprint, normalize_with_limit, AnalysisReport, Error, KnowledgeBase, Result, StoredResult,
    MAX_INPUT_CHARS,
};
use complyscan_store::ResultStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Returned when the request carries no usable input
pub const INPUT_REQUIRED_MESSAGE: &str = "请输入您的情况描述";

/// Returned when the classifier fails during inference
pub const INFERENCE_FAILURE_MESSAGE: &str = "分析过程中出现错误，请稍后重试或尝试较短的文本";

/// Returned when classification exceeds its deadline
pub const TIMEOUT_MESSAGE: &str = "分析时间过长，请尝试缩短输入文本或稍后重试";

/// Returned for any other failure
pub const INTERNAL_ERROR_MESSAGE: &str = "分析过程中出现错误，请稍后重试";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one analysis
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Completed(AnalysisReport),

    /// The classifier failed; nothing was recorded
    Failed { message: String },
}

/// Runs the analysis pipeline over shared classifier, store and knowledge base
pub struct Analyzer {
    classifier: Arc<dyn CategoryClassifier>,
    store: Arc<dyn ResultStore>,
    knowledge: Arc<KnowledgeBase>,
    max_input_chars: usize,
    timeout: Duration,
}

impl Analyzer {
    pub fn new(
        classifier: Arc<dyn CategoryClassifier>,
        store: Arc<dyn ResultStore>,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self {
            classifier,
            store,
            knowledge,
            max_input_chars: MAX_INPUT_CHARS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the classification deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the normalization length cap
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Analyze raw user text
    ///
    /// Inference failures become [`Analysis::Failed`]. A missed deadline is
    /// [`Error::Timeout`]; store and other errors propagate.
    pub async fn analyze(&self, raw: &str) -> Result<Analysis> {
        let text = normalize_with_limit(raw, self.max_input_chars);
        let key = fingerprint(&text);

        if let Some(stored) = self.store.lookup(&text).await? {
            metrics::counter!("complyscan_cache_hits_total").increment(1);
            debug!(input = %key, backend = self.store.backend(), "Store hit");
            return Ok(Analysis::Completed(self.report_from_stored(stored)));
        }

        let start = Instant::now();
        let ranking = match tokio::time::timeout(self.timeout, self.classifier.classify(&text)).await
        {
            Err(_) => {
                warn!(input = %key, "Classification exceeded {:?}", self.timeout);
                return Err(Error::Timeout(self.timeout.as_secs()));
            }
            Ok(Err(e)) if e.is_inference() => {
                metrics::counter!("complyscan_inference_failures_total").increment(1);
                error!(input = %key, "Classifier failed: {}", e);
                return Ok(Analysis::Failed {
                    message: INFERENCE_FAILURE_MESSAGE.to_string(),
                });
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(ranking)) => ranking,
        };

        metrics::histogram!("complyscan_inference_latency_us")
            .record(start.elapsed().as_micros() as f64);

        let report = self.report_from_ranking(&ranking);

        if report.is_empty() {
            debug!(input = %key, "No categories identified, not recording");
        } else if !report.is_recordable() {
            warn!(
                input = %key,
                issues = ?report.identified_issues,
                "No regulations for identified categories, not recording"
            );
        } else {
            self.store.record(&text, &report.to_stored()).await?;
            info!(
                input = %key,
                issues = ?report.identified_issues,
                "Analysis recorded"
            );
        }

        Ok(Analysis::Completed(report))
    }

    fn report_from_ranking(&self, ranking: &[RankedCategory]) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        for ranked in ranking {
            let guidance = self.knowledge.lookup(&ranked.label);
            report.identified_issues.push(ranked.label.clone());
            report
                .relevant_regulations
                .extend(guidance.flattened_regulations());
            report.explanations.push(guidance.explanation.to_string());
            report
                .recommendations
                .push(guidance.recommendation.to_string());
        }

        report
    }

    fn report_from_stored(&self, stored: StoredResult) -> AnalysisReport {
        let (explanations, recommendations) = stored
            .issues
            .iter()
            .map(|issue| {
                let guidance = self.knowledge.lookup(issue);
                (
                    guidance.explanation.to_string(),
                    guidance.recommendation.to_string(),
                )
            })
            .unzip();

        AnalysisReport {
            identified_issues: stored.issues,
            relevant_regulations: stored.regulations,
            explanations,
            recommendations,
            cached: true,
        }
    }
}
