//! Clustering pipeline stages

pub mod k_selector;
pub mod kmeans;
pub mod knee;
pub mod labeling;
pub mod lemma_cache;
pub mod summarizer;
pub mod vectorizer;

pub use k_selector::{CostPoint, KSelection, KSelector};
pub use kmeans::{ClusterModel, KMeans};
pub use knee::{find_knee, CurvePoint};
pub use labeling::{
    collect_labels, FileLabelProvider, KeywordLabelProvider, LabelMap, LabelProvider,
    TerminalLabelProvider,
};
pub use lemma_cache::{CacheManifest, CacheStatus, LemmaCache};
pub use summarizer::{ClusterSummary, Summarizer};
pub use vectorizer::{FittedVectorizer, SparseVector, TfidfVectorizer};
