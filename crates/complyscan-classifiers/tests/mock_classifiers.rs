//! Mock classifiers for testing
//!
//! Configurable implementations of the CategoryClassifier trait, used to
//! exercise ranking, error handling and latency behaviour without model files.

use async_trait::async_trait;
use complyscan_classifiers::{rank, CategoryClassifier, RankedCategory, DEFAULT_TOP_K};
use complyscan_core::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// A configurable mock classifier for testing
pub struct MockClassifier {
    name: String,
    labels: Vec<String>,
    scores: Vec<f32>,
    top_k: usize,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockClassifier {
    /// Mock over `labels`, scoring them in descending index order
    pub fn new(name: &str, labels: &[&str]) -> Self {
        let n = labels.len();
        Self {
            name: name.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            scores: (0..n).map(|i| (n - i) as f32 / n as f32).collect(),
            top_k: DEFAULT_TOP_K,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the raw score vector, aligned with the labels
    pub fn with_scores(mut self, scores: &[f32]) -> Self {
        self.scores = scores.to_vec();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set simulated latency for this classifier
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Get the number of times classify was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CategoryClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<RankedCategory>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        if text.is_empty() {
            return Ok(Vec::new());
        }

        // A label named in the text wins
        let scores: Vec<f32> = self
            .labels
            .iter()
            .zip(&self.scores)
            .map(|(label, score)| if text.contains(label.as_str()) { 1.0 } else { *score })
            .collect();

        Ok(rank(&scores, &self.labels, self.top_k))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// A classifier that always fails - for testing error paths
pub struct FailingClassifier {
    error_message: String,
    labels: Vec<String>,
}

impl FailingClassifier {
    pub fn new() -> Self {
        Self {
            error_message: "Simulated inference failure".to_string(),
            labels: Vec::new(),
        }
    }

    /// Set a custom error message
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }
}

#[async_trait]
impl CategoryClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<RankedCategory>> {
        Err(Error::inference(&self.error_message))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

const LABELS: &[&str] = &["财务合规", "税务合规", "劳动用工合规", "数据与隐私保护", "知识产权"];

#[tokio::test]
async fn test_mock_returns_top_three() {
    let classifier = MockClassifier::new("mock", LABELS);

    let ranked = classifier.classify("公司账目").await.unwrap();
    let names: Vec<_> = ranked.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(names, vec!["财务合规", "税务合规", "劳动用工合规"]);
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn test_mock_keyword_ranks_first() {
    let classifier = MockClassifier::new("mock", LABELS);

    let ranked = classifier.classify("涉及知识产权纠纷").await.unwrap();
    assert_eq!(ranked[0].label, "知识产权");
    assert_eq!(ranked[0].index, 4);
    assert_eq!(ranked.len(), 3);
}

#[tokio::test]
async fn test_ranking_has_no_threshold_or_duplicates() {
    let classifier =
        MockClassifier::new("mock", LABELS).with_scores(&[0.01, 0.02, 0.9, 0.03, 0.04]);

    let ranked = classifier.classify("随便说说").await.unwrap();
    let idx: Vec<_> = ranked.iter().map(|r| r.index).collect();
    assert_eq!(idx, vec![2, 4, 3]);
    assert!(ranked[2].score < 0.05);
}

#[tokio::test]
async fn test_top_k_configurable() {
    let classifier = MockClassifier::new("mock", LABELS).with_top_k(1);
    assert_eq!(classifier.classify("测试").await.unwrap().len(), 1);

    let classifier = MockClassifier::new("mock", &["甲", "乙"]);
    assert_eq!(classifier.classify("测试").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_text_yields_empty_ranking() {
    let classifier = MockClassifier::new("mock", LABELS);
    assert!(classifier.classify("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_classifier_reports_inference_error() {
    let classifier = FailingClassifier::new().with_error("tensor shape mismatch");

    let err = classifier.classify("测试").await.unwrap_err();
    assert!(err.is_inference());
    assert!(err.to_string().contains("tensor shape mismatch"));
}

#[tokio::test]
async fn test_mock_classifier_latency() {
    let classifier = MockClassifier::new("slow", LABELS).with_latency(Duration::from_millis(10));

    let start = std::time::Instant::now();
    let _ = classifier.classify("测试").await;
    assert!(start.elapsed() >= Duration::from_millis(10));
}

#[tokio::test]
async fn test_classifier_as_trait_object() {
    let classifiers: Vec<Box<dyn CategoryClassifier>> = vec![
        Box::new(MockClassifier::new("mock", LABELS)),
        Box::new(FailingClassifier::new()),
    ];

    assert_eq!(classifiers[0].labels().len(), 5);
    assert!(classifiers[1].classify("测试").await.is_err());
    assert_eq!(classifiers[1].name(), "failing");
}
