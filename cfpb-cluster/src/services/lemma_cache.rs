//! Lemmatization cache
//!
//! Lemmatizing a large complaint batch dominates run time, so the full
//! normalized table (raw fields, cleaned text, lemmas) is persisted and
//! reused. A JSON manifest next to the cache records the SHA-256 of the
//! input table it was built from and the normalization settings used:
//!
//! - manifest matches the current input and settings: hit
//! - manifest names a different input or different settings: stale, recompute
//! - no manifest (cache written by an older tool): hit
//! - input table gone but cache present: hit
//! - cache row count differs from the manifest: corrupt, recompute

use crate::error::ClusterResult;
use crate::models::NormalizedDocument;
use crate::table;
use crate::text::NormalizationSettings;
use cfpb_common::fs::{sha256_file, write_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Sidecar describing how a cache file was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// SHA-256 of the input table, if it existed at write time
    pub input_sha256: Option<String>,
    /// Normalization settings the rows were produced with; absent in
    /// manifests written before settings were recorded
    #[serde(default)]
    pub settings: Option<NormalizationSettings>,
    /// Rows in the cache table
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Loaded from a cache whose manifest matches the input
    Hit,
    /// Loaded from a cache without manifest
    LegacyHit,
    /// No cache file
    Missing,
    /// Cache built from a different input or with different settings
    Stale,
    /// Cache unreadable or inconsistent with its manifest
    Corrupt,
    /// Lookup skipped on request
    Bypassed,
}

impl CacheStatus {
    pub fn is_hit(self) -> bool {
        matches!(self, CacheStatus::Hit | CacheStatus::LegacyHit)
    }
}

/// Lemma cache bound to one cache file and one set of normalization settings
#[derive(Debug, Clone)]
pub struct LemmaCache {
    path: PathBuf,
    settings: NormalizationSettings,
}

impl LemmaCache {
    pub fn new(path: impl Into<PathBuf>, settings: NormalizationSettings) -> Self {
        Self {
            path: path.into(),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the manifest sidecar: `<cache>.manifest.json`
    pub fn manifest_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".manifest.json");
        PathBuf::from(name)
    }

    /// Look up cached documents for `input`
    ///
    /// Returns the documents only on a hit. Misses of every kind are
    /// reported through the status and never fail the run.
    pub fn load(&self, input: &Path) -> (CacheStatus, Option<Vec<NormalizedDocument>>) {
        if !self.path.exists() {
            info!(cache = %self.path.display(), "No lemma cache, lemmatizing from scratch");
            return (CacheStatus::Missing, None);
        }

        let manifest = match self.read_manifest() {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "Unreadable lemma cache manifest, recomputing");
                return (CacheStatus::Corrupt, None);
            }
        };

        if let Some(manifest) = &manifest {
            if manifest.settings != Some(self.settings) {
                warn!(
                    cache = %self.path.display(),
                    cached = ?manifest.settings,
                    requested = ?self.settings,
                    "Lemma cache was built with different normalization settings, recomputing"
                );
                return (CacheStatus::Stale, None);
            }
            if let Some(expected) = &manifest.input_sha256 {
                if input.exists() {
                    match sha256_file(input) {
                        Ok(actual) if &actual == expected => {}
                        Ok(_) => {
                            warn!(
                                cache = %self.path.display(),
                                input = %input.display(),
                                "Lemma cache was built from a different input, recomputing"
                            );
                            return (CacheStatus::Stale, None);
                        }
                        Err(e) => {
                            warn!(error = %e, "Could not fingerprint input, recomputing");
                            return (CacheStatus::Stale, None);
                        }
                    }
                }
            }
        }

        let documents = match table::read_documents(&self.path) {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, cache = %self.path.display(), "Unreadable lemma cache, recomputing");
                return (CacheStatus::Corrupt, None);
            }
        };

        let status = match &manifest {
            Some(manifest) if manifest.row_count != documents.len() => {
                warn!(
                    expected = manifest.row_count,
                    found = documents.len(),
                    "Lemma cache row count does not match manifest, recomputing"
                );
                return (CacheStatus::Corrupt, None);
            }
            Some(_) => CacheStatus::Hit,
            None => CacheStatus::LegacyHit,
        };

        info!(
            cache = %self.path.display(),
            rows = documents.len(),
            status = ?status,
            "Loaded lemmatized complaints from cache"
        );
        (status, Some(documents))
    }

    /// Persist `documents` as the cache for `input`
    ///
    /// The table is written before the manifest, both atomically.
    pub fn store(&self, input: &Path, documents: &[NormalizedDocument]) -> ClusterResult<()> {
        table::write_documents(&self.path, documents)?;

        let manifest = CacheManifest {
            input_sha256: if input.exists() {
                Some(sha256_file(input)?)
            } else {
                None
            },
            settings: Some(self.settings),
            row_count: documents.len(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(&self.manifest_path(), |out| {
            out.write_all(&json)?;
            Ok(())
        })?;

        info!(cache = %self.path.display(), rows = documents.len(), "Saved lemma cache");
        Ok(())
    }

    fn read_manifest(&self) -> ClusterResult<Option<CacheManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
