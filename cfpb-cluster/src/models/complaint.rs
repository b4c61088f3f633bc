//! Complaint table rows
//!
//! Column names follow the consumer complaint database export so the raw
//! fetch output, the lemmatization cache and the labeled output can be read
//! by the same tooling.

use serde::{Deserialize, Serialize};

/// Raw complaint as fetched from the complaint database
///
/// Immutable once loaded. Any column other than these four is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    /// Free-text consumer narrative
    #[serde(rename = "complaint_what_happened", default)]
    pub narrative: Option<String>,

    #[serde(rename = "date_sent_to_company", default)]
    pub date_sent: Option<String>,

    #[serde(default)]
    pub submitted_via: Option<String>,

    #[serde(default)]
    pub state: Option<String>,
}

impl ComplaintRecord {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: Some(narrative.into()),
            date_sent: None,
            submitted_via: None,
            state: None,
        }
    }
}

/// Complaint after cleaning and lemmatization
///
/// This is the lemmatization cache row. `lemmatized_text` is never null:
/// a document with no surviving tokens carries an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    #[serde(rename = "complaint_what_happened")]
    pub narrative: String,

    #[serde(rename = "date_sent_to_company", default)]
    pub date_sent: Option<String>,

    #[serde(default)]
    pub submitted_via: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub clean_text: String,

    #[serde(default)]
    pub lemmatized_text: String,
}

/// Final output row: complaint plus its cluster and label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledComplaint {
    #[serde(rename = "complaint_what_happened")]
    pub narrative: String,

    #[serde(rename = "date_sent_to_company")]
    pub date_sent: Option<String>,

    pub submitted_via: Option<String>,

    pub state: Option<String>,

    pub group_id: usize,

    pub group_name: String,
}

impl LabeledComplaint {
    /// Join a normalized document with its group assignment
    pub fn from_document(doc: &NormalizedDocument, group_id: usize, group_name: &str) -> Self {
        Self {
            narrative: doc.narrative.clone(),
            date_sent: doc.date_sent.clone(),
            submitted_via: doc.submitted_via.clone(),
            state: doc.state.clone(),
            group_id,
            group_name: group_name.to_string(),
        }
    }
}
