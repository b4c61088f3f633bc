//! CSV tables: raw complaints in, lemma cache and labeled complaints out
//!
//! Outputs are written through [`cfpb_common::fs::write_atomic`], so a
//! reader never sees a partially written table.

use crate::error::ClusterResult;
use crate::models::{ComplaintRecord, LabeledComplaint, NormalizedDocument};
use cfpb_common::fs::write_atomic;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Read the raw complaint table; unknown columns are ignored
pub fn read_complaints(path: &Path) -> ClusterResult<Vec<ComplaintRecord>> {
    read_rows(path)
}

/// Read a lemma cache table
pub fn read_documents(path: &Path) -> ClusterResult<Vec<NormalizedDocument>> {
    read_rows(path)
}

/// Write a lemma cache table
pub fn write_documents(path: &Path, documents: &[NormalizedDocument]) -> ClusterResult<()> {
    write_rows(path, documents)
}

/// Write the final labeled table
pub fn write_labeled(path: &Path, rows: &[LabeledComplaint]) -> ClusterResult<()> {
    write_rows(path, rows)
}

/// Write free-form JSON records, using the first record's keys as header
///
/// Keys missing from later records produce empty cells; keys absent from
/// the first record are dropped. Nulls become empty cells, strings are
/// written verbatim and any other value as its JSON text.
pub fn write_json_records(path: &Path, records: &[Map<String, Value>]) -> ClusterResult<()> {
    let header: Vec<String> = records
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    write_atomic(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        if !header.is_empty() {
            writer.write_record(&header).map_err(std::io::Error::from)?;
        }
        for record in records {
            let row = header.iter().map(|key| cell_text(record.get(key)));
            writer.write_record(row).map_err(std::io::Error::from)?;
        }
        writer.flush()?;
        Ok(())
    })?;

    debug!(path = %path.display(), rows = records.len(), "Wrote raw complaint table");
    Ok(())
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> ClusterResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    debug!(path = %path.display(), rows = rows.len(), "Read table");
    Ok(rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> ClusterResult<()> {
    write_atomic(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        for row in rows {
            writer.serialize(row).map_err(std::io::Error::from)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote table");
    Ok(())
}
