//! BERT sequence classifier over the compliance taxonomy
//!
//! Loads a BERT-family checkpoint with Candle (local directory or Hugging
//! Face Hub), runs the encoder on the `[CLS]` token, applies the pooler and a
//! linear classification head, and ranks the labels by softmax score.
//!
//! Checkpoints without a trained classification head (for example plain
//! `bert-base-chinese`) get a randomly initialized head, matching what
//! `from_pretrained(..., num_labels=N)` does. Such a model must be fine-tuned
//! before its rankings mean anything.

use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use complyscan_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationParams};

use crate::classifier::{rank, CategoryClassifier, RankedCategory};
use crate::model_config::{ClassifierSettings, ModelSource};

/// BERT classifier; cheap to clone, the model is shared
#[derive(Clone)]
pub struct BertCategoryClassifier {
    inner: Arc<BertInner>,
}

struct BertInner {
    name: String,
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    head: Linear,
    device: Device,
    labels: Vec<String>,
    max_length: usize,
    top_k: usize,
}

impl BertCategoryClassifier {
    /// Load model, tokenizer and head; blocks on downloads and file I/O
    pub fn load(settings: &ClassifierSettings, labels: Vec<String>) -> Result<Self> {
        settings.validate(labels.len())?;

        let model_dir = resolve_model_dir(&settings.source)?;
        let tokenizer = load_tokenizer(&model_dir, settings.max_length)?;
        let bert_config: BertConfig = parse_json_config(&model_dir.join("config.json"))?;

        let device = get_device(&settings.device)?;
        let vb = load_var_builder(&model_dir, &device)?;

        let (model, prefix) = load_bert_backbone(&vb, &bert_config, &["bert", ""])?;
        let pooler = load_pooler(&vb, prefix, bert_config.hidden_size);
        let head = load_classification_head(&vb, bert_config.hidden_size, labels.len())?;

        tracing::info!(
            "Loaded BERT classifier '{}' from {} with {} labels (top_k={}, max_length={})",
            settings.name,
            model_dir.display(),
            labels.len(),
            settings.top_k,
            settings.max_length
        );

        Ok(Self {
            inner: Arc::new(BertInner {
                name: settings.name.clone(),
                tokenizer,
                model,
                pooler,
                head,
                device,
                labels,
                max_length: settings.max_length,
                top_k: settings.top_k,
            }),
        })
    }
}

#[async_trait]
impl CategoryClassifier for BertCategoryClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<RankedCategory>> {
        if text.trim().is_empty() {
            tracing::debug!("Empty input, skipping forward pass");
            return Ok(Vec::new());
        }

        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || inner.rank(&text))
            .await
            .map_err(|e| Error::inference(format!("Inference task aborted: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn labels(&self) -> &[String] {
        &self.inner.labels
    }
}

impl BertInner {
    fn rank(&self, text: &str) -> Result<Vec<RankedCategory>> {
        let start = Instant::now();
        let scores = self.scores(text)?;

        if scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::inference("Model produced non-finite scores"));
        }

        let ranking = rank(&scores, &self.labels, self.top_k);
        tracing::debug!(
            "Forward pass over {} labels took {}us",
            scores.len(),
            start.elapsed().as_micros()
        );
        Ok(ranking)
    }

    fn scores(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::inference(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference("Failed to create input tensor"))?;

        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference("Failed to create token type tensor"))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(inference("Model forward pass failed"))?;

        let cls_embedding = hidden_states
            .i((0, 0, ..))
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference("Failed to get CLS token"))?;

        let pooled = match &self.pooler {
            Some(pooler) => pooler
                .forward(&cls_embedding)
                .and_then(|t| t.tanh())
                .map_err(inference("Pooler failed"))?,
            None => cls_embedding,
        };

        let logits = self
            .head
            .forward(&pooled)
            .map_err(inference("Classification head failed"))?;

        candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(inference("Softmax failed"))
    }
}

fn inference(context: &'static str) -> impl Fn(candle_core::Error) -> Error {
    move |e| Error::inference(format!("{}: {}", context, e))
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::config(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::config(format!("Failed to initialize Metal: {}", e))),
        _ => Ok(Device::Cpu),
    }
}

/// Local directory or Hugging Face cache directory holding the model files
fn resolve_model_dir(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, revision } => download_from_huggingface(repo, revision),
    }
}

fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!("Fetching model from HuggingFace: {} @ {}", repo, revision);

    let api = hf_hub::api::sync::Api::new()
        .map_err(|e| Error::config(format!("Failed to initialize HuggingFace API: {}", e)))?;

    let repo_obj = api.repo(hf_hub::Repo::with_revision(
        repo.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    let config_path = repo_obj
        .get("config.json")
        .map_err(|e| Error::config(format!("Failed to download config.json: {}", e)))?;

    repo_obj
        .get("model.safetensors")
        .map_err(|e| Error::config(format!("Failed to download model.safetensors: {}", e)))?;

    let mut found_tokenizer = false;
    for file in ["tokenizer.json", "vocab.txt"] {
        match repo_obj.get(file) {
            Ok(_) => {
                tracing::debug!("Found tokenizer file: {}", file);
                found_tokenizer = true;
            }
            Err(_) => tracing::debug!("File not found: {}", file),
        }
    }

    if !found_tokenizer {
        return Err(Error::config(
            "No tokenizer found (tried tokenizer.json, vocab.txt)",
        ));
    }

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::config("Invalid HuggingFace cache path"))?;

    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir.to_path_buf())
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::config(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::config(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::config(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    // SAFETY: the weights file is memory-mapped read-only and not modified
    // while the process runs.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::config(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

fn with_prefix<'a>(vb: &VarBuilder<'a>, prefix: &str) -> VarBuilder<'a> {
    if prefix.is_empty() {
        vb.clone()
    } else {
        vb.pp(prefix)
    }
}

/// Backbone plus the prefix it was found under
fn load_bert_backbone<'p>(
    vb: &VarBuilder,
    config: &BertConfig,
    prefixes: &[&'p str],
) -> Result<(BertModel, &'p str)> {
    let mut errors = Vec::new();

    for &prefix in prefixes {
        let shown = if prefix.is_empty() { "<root>" } else { prefix };

        match BertModel::load(with_prefix(vb, prefix), config) {
            Ok(model) => {
                tracing::info!("Loaded BERT backbone from '{}'", shown);
                return Ok((model, prefix));
            }
            Err(e) => errors.push(format!("{}: {}", shown, e)),
        }
    }

    Err(Error::config(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

/// Pooler under the same prefix as the backbone
fn load_pooler(vb: &VarBuilder, prefix: &str, hidden_size: usize) -> Option<Linear> {
    let vb_pooler = with_prefix(vb, prefix).pp("pooler").pp("dense");
    match candle_nn::linear(hidden_size, hidden_size, vb_pooler) {
        Ok(linear) => Some(linear),
        Err(e) => {
            tracing::debug!(
                "No pooler weights under '{}' ({}), classifying the raw [CLS] embedding",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            );
            None
        }
    }
}

fn load_classification_head(vb: &VarBuilder, hidden_size: usize, num_labels: usize) -> Result<Linear> {
    if let Ok(linear) = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier")) {
        tracing::info!(
            "Loaded classification head (hidden_size={}, num_labels={})",
            hidden_size,
            num_labels
        );
        return Ok(linear);
    }

    tracing::warn!(
        "No pre-trained classification head for {} labels, initializing random weights. \
         Model should be fine-tuned before use.",
        num_labels
    );

    let weight = Tensor::randn(0f32, 0.02, (num_labels, hidden_size), vb.device())
        .map_err(|e| Error::config(format!("Failed to init weights: {}", e)))?;
    let bias = Tensor::zeros((num_labels,), DType::F32, vb.device())
        .map_err(|e| Error::config(format!("Failed to init bias: {}", e)))?;

    Ok(Linear::new(weight, Some(bias)))
}

/// Tokenizer truncating to `max_length` tokens, special tokens included
fn load_tokenizer(model_dir: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = read_tokenizer(model_dir)?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::config(format!("Invalid truncation settings: {}", e)))?;
    Ok(tokenizer)
}

fn read_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_dir.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::config(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_dir.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::config(format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        let sep = ("[SEP]".to_string(), 102);
        let cls = ("[CLS]".to_string(), 101);
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(Error::config(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
        model_dir.display()
    )))
}
