//! Batch normalization: filter, clean, lemmatize
//!
//! Records without a narrative are dropped first. The mean narrative length
//! is then computed once over the remaining raw batch, and (when
//! `short_form_only` is set) only narratives strictly shorter than that mean
//! are kept. Lengths are counted in characters of the original, uncleaned
//! narrative.

use super::lemmatizer::Lemmatizer;
use super::redaction::clean_redactions;
use crate::models::{ComplaintRecord, NormalizedDocument};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Bumped whenever cleaning or lemmatization output changes
pub const NORMALIZER_VERSION: u32 = 1;

/// Everything besides the input that determines normalized output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSettings {
    pub version: u32,
    pub short_form_only: bool,
}

/// Counts reported by one normalization pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationStats {
    /// Records in the raw batch
    pub total_records: usize,
    /// Records carrying a narrative
    pub with_narrative: usize,
    /// Mean original narrative length (0 when no narrative exists)
    pub mean_length: f64,
    /// Documents handed downstream
    pub retained: usize,
}

/// Text normalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    lemmatizer: Lemmatizer,
    short_form_only: bool,
}

impl Normalizer {
    pub fn new(short_form_only: bool) -> Self {
        Self {
            lemmatizer: Lemmatizer::new(),
            short_form_only,
        }
    }

    pub fn settings(&self) -> NormalizationSettings {
        NormalizationSettings {
            version: NORMALIZER_VERSION,
            short_form_only: self.short_form_only,
        }
    }

    /// Mean character length of the narratives present in `records`
    ///
    /// Returns `None` when no record has a narrative.
    pub fn mean_narrative_length(records: &[ComplaintRecord]) -> Option<f64> {
        let lengths: Vec<usize> = records
            .iter()
            .filter_map(|r| r.narrative.as_deref())
            .map(|n| n.chars().count())
            .collect();
        if lengths.is_empty() {
            return None;
        }
        Some(lengths.iter().sum::<usize>() as f64 / lengths.len() as f64)
    }

    /// Normalize a whole batch, preserving input order
    pub fn normalize_batch(
        &self,
        records: &[ComplaintRecord],
    ) -> (Vec<NormalizedDocument>, NormalizationStats) {
        let mean_length = Self::mean_narrative_length(records).unwrap_or(0.0);

        let documents: Vec<NormalizedDocument> = records
            .iter()
            .filter_map(|record| {
                let narrative = record.narrative.as_deref()?;
                if self.short_form_only && narrative.chars().count() as f64 >= mean_length {
                    return None;
                }
                Some(self.normalize_record(record, narrative))
            })
            .collect();

        let stats = NormalizationStats {
            total_records: records.len(),
            with_narrative: records.iter().filter(|r| r.narrative.is_some()).count(),
            mean_length,
            retained: documents.len(),
        };

        info!(
            total = stats.total_records,
            with_narrative = stats.with_narrative,
            mean_length = stats.mean_length,
            retained = stats.retained,
            "Normalized complaint batch"
        );

        (documents, stats)
    }

    fn normalize_record(&self, record: &ComplaintRecord, narrative: &str) -> NormalizedDocument {
        let clean_text = clean_redactions(narrative);
        let lemmatized_text = self.lemmatizer.lemmatize(&clean_text);
        if lemmatized_text.is_empty() {
            debug!("Narrative has no surviving tokens after lemmatization");
        }

        NormalizedDocument {
            narrative: narrative.to_string(),
            date_sent: record.date_sent.clone(),
            submitted_via: record.submitted_via.clone(),
            state: record.state.clone(),
            clean_text,
            lemmatized_text,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(narrative: Option<&str>) -> ComplaintRecord {
        ComplaintRecord {
            narrative: narrative.map(str::to_string),
            date_sent: Some("2025-01-15".to_string()),
            submitted_via: Some("Web".to_string()),
            state: Some("NY".to_string()),
        }
    }

    #[test]
    fn test_mean_ignores_missing_narratives() {
        let records = vec![record(Some("abcd")), record(None), record(Some("ab"))];
        assert_eq!(Normalizer::mean_narrative_length(&records), Some(3.0));
        assert_eq!(Normalizer::mean_narrative_length(&[record(None)]), None);
    }

    #[test]
    fn test_keeps_only_strictly_shorter_than_mean() {
        // Lengths 9, 19, 29: mean is 19, so only the first survives
        let records = vec![
            record(Some("late fees")),
            record(Some("late fee charged ok")),
            record(Some("fraud on my card was reported")),
            record(None),
        ];
        let lengths: Vec<usize> = records
            .iter()
            .filter_map(|r| r.narrative.as_deref())
            .map(|n| n.chars().count())
            .collect();
        assert_eq!(lengths, vec![9, 19, 29]);

        let (docs, stats) = Normalizer::new(true).normalize_batch(&records);
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.with_narrative, 3);
        assert!((stats.mean_length - 19.0).abs() < 1e-9);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].narrative, "late fees");
        assert_eq!(docs[0].lemmatized_text, "late fee");
    }

    #[test]
    fn test_equal_lengths_all_filtered() {
        let records = vec![record(Some("same")), record(Some("size"))];
        let (docs, stats) = Normalizer::new(true).normalize_batch(&records);
        assert!(docs.is_empty());
        assert_eq!(stats.retained, 0);
    }

    #[test]
    fn test_filter_disabled_keeps_every_narrative() {
        let records = vec![record(Some("same")), record(None), record(Some("size"))];
        let (docs, _) = Normalizer::new(false).normalize_batch(&records);
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_document_carries_raw_fields_and_both_texts() {
        let records = vec![record(Some("XXXX/XX/XXXX I paid   late"))];
        let (docs, _) = Normalizer::new(false).normalize_batch(&records);
        let doc = &docs[0];
        assert_eq!(doc.narrative, "XXXX/XX/XXXX I paid   late");
        assert_eq!(doc.clean_text, "I paid late");
        assert_eq!(doc.lemmatized_text, "pay late");
        assert_eq!(doc.state.as_deref(), Some("NY"));
        assert_eq!(doc.submitted_via.as_deref(), Some("Web"));
    }

    #[test]
    fn test_fully_filtered_document_is_empty_string() {
        let records = vec![record(Some("XXXX it was the"))];
        let (docs, _) = Normalizer::new(false).normalize_batch(&records);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].lemmatized_text, "");
    }
}
