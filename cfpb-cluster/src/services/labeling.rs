//! Cluster naming
//!
//! A [`LabelProvider`] turns a cluster's keywords and examples into a name.
//! Providers may return anything; [`collect_labels`] trims the answer and
//! substitutes `group_<id>` when nothing is left.

use super::summarizer::ClusterSummary;
use crate::error::{ClusterError, ClusterResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

/// Source of cluster names
pub trait LabelProvider {
    /// Name for one cluster
    fn get_label(
        &mut self,
        group_id: usize,
        keywords: &[String],
        examples: &[String],
    ) -> ClusterResult<String>;
}

/// Fallback name for a cluster left unnamed
pub fn fallback_label(group_id: usize) -> String {
    format!("group_{group_id}")
}

/// Final group id to name mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<usize, String>,
}

impl LabelMap {
    /// Name of `group_id`, or its fallback when unknown
    pub fn get(&self, group_id: usize) -> String {
        self.labels
            .get(&group_id)
            .cloned()
            .unwrap_or_else(|| fallback_label(group_id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(&id, name)| (id, name.as_str()))
    }

    fn insert(&mut self, group_id: usize, raw: &str) {
        let trimmed = raw.trim();
        let name = if trimmed.is_empty() {
            warn!(group_id, "Empty label, using fallback");
            fallback_label(group_id)
        } else {
            trimmed.to_string()
        };
        self.labels.insert(group_id, name);
    }
}

/// Ask `provider` for a name for every summarized cluster
pub fn collect_labels(
    provider: &mut dyn LabelProvider,
    summaries: &[ClusterSummary],
) -> ClusterResult<LabelMap> {
    let mut map = LabelMap::default();
    for summary in summaries {
        let raw = provider.get_label(summary.group_id, &summary.keywords, &summary.examples)?;
        map.insert(summary.group_id, &raw);
    }
    info!(groups = map.len(), "Collected cluster labels");
    Ok(map)
}

/// Interactive prompt: prints each cluster and reads one line per name
pub struct TerminalLabelProvider<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalLabelProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalLabelProvider<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process terminal
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> LabelProvider for TerminalLabelProvider<R, W> {
    fn get_label(
        &mut self,
        group_id: usize,
        keywords: &[String],
        examples: &[String],
    ) -> ClusterResult<String> {
        self.prompt(group_id, keywords, examples)
            .map_err(|e| ClusterError::LabelProvider(format!("Terminal prompt for group {group_id} failed: {e}")))?;

        // End of input leaves the label empty
        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .map_err(|e| ClusterError::LabelProvider(format!("Could not read label for group {group_id}: {e}")))?;
        Ok(line)
    }
}

impl<R: BufRead, W: Write> TerminalLabelProvider<R, W> {
    fn prompt(&mut self, group_id: usize, keywords: &[String], examples: &[String]) -> std::io::Result<()> {
        let out = &mut self.output;
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "Group {group_id}")?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "Keywords: {}", keywords.join(", "))?;
        writeln!(out, "Examples:")?;
        for example in examples {
            writeln!(out, "  - {example}")?;
        }
        write!(out, "Label for group {group_id}: ")?;
        out.flush()
    }
}

#[derive(Debug, Deserialize)]
struct LabelFile {
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

/// Names read from a TOML file:
///
/// ```toml
/// [labels]
/// 0 = "Late fees"
/// 1 = "Card fraud"
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileLabelProvider {
    labels: BTreeMap<usize, String>,
}

impl FileLabelProvider {
    pub fn from_path(path: &Path) -> ClusterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| ClusterError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> ClusterResult<Self> {
        let file: LabelFile = toml::from_str(text)
            .map_err(|e| ClusterError::InvalidConfig(format!("Invalid label file: {e}")))?;
        let labels = file
            .labels
            .into_iter()
            .map(|(key, name)| {
                key.trim()
                    .parse::<usize>()
                    .map(|id| (id, name))
                    .map_err(|_| ClusterError::InvalidConfig(format!("Label key '{key}' is not a group id")))
            })
            .collect::<ClusterResult<BTreeMap<usize, String>>>()?;
        Ok(Self { labels })
    }
}

impl LabelProvider for FileLabelProvider {
    fn get_label(&mut self, group_id: usize, _: &[String], _: &[String]) -> ClusterResult<String> {
        match self.labels.get(&group_id) {
            Some(name) => Ok(name.clone()),
            None => {
                warn!(group_id, "Label file has no entry for group");
                Ok(String::new())
            }
        }
    }
}

/// Automatic names from the leading keywords, joined with `_`
#[derive(Debug, Clone, Copy)]
pub struct KeywordLabelProvider {
    terms: usize,
}

impl KeywordLabelProvider {
    pub fn new(terms: usize) -> Self {
        Self { terms }
    }
}

impl Default for KeywordLabelProvider {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LabelProvider for KeywordLabelProvider {
    fn get_label(&mut self, _: usize, keywords: &[String], _: &[String]) -> ClusterResult<String> {
        Ok(keywords
            .iter()
            .take(self.terms)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("_"))
    }
}
