//! ComplyScan Classifiers
//!
//! Maps normalized Chinese text to the compliance issue categories of the
//! knowledge base.
//!
//! The [`CategoryClassifier`] trait is the seam the server depends on. The
//! default implementation, [`BertCategoryClassifier`], runs a BERT-family
//! sequence classifier with Candle and returns the top-k categories by
//! softmax score, with no threshold.

pub mod classifier;
pub mod model_config;

#[cfg(feature = "ml-models")]
pub mod bert;

pub use classifier::{rank, top_k_indices, CategoryClassifier, RankedCategory, DEFAULT_TOP_K};
pub use model_config::{ClassifierSettings, ModelSource};

#[cfg(feature = "ml-models")]
pub use bert::BertCategoryClassifier;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{CategoryClassifier, RankedCategory};
    pub use crate::model_config::{ClassifierSettings, ModelSource};

    #[cfg(feature = "ml-models")]
    pub use crate::bert::BertCategoryClassifier;
}
