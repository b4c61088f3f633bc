//! Text normalization: redaction removal, short-form filtering, lemmatization

pub mod lemmatizer;
pub mod normalizer;
pub mod redaction;

pub use lemmatizer::Lemmatizer;
pub use normalizer::{NormalizationSettings, NormalizationStats, Normalizer, NORMALIZER_VERSION};
pub use redaction::{clean_narrative, clean_redactions};
