//! Job catalog loading.
//!
//! The catalog is a JSON object keyed by job name. Entries are kept raw until
//! a job is requested; lookup turns one entry into a validated
//! [`JobDescriptor`], so a bad entry only fails its own job.

use crate::job::{Compression, JobDescriptor, JobKind};
use crate::utils::JobError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One catalog record, as written in the JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogEntry {
    pub source: String,
    pub destination: String,
    pub retain: i64,

    /// Accepted for compatibility, not used
    pub user: String,

    pub verbose: bool,

    #[serde(rename = "Type")]
    pub kind: String,

    pub change_dir: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_type: Option<String>,

    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    /// Load a catalog from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "unable to read job catalog {}, does it exist?",
                path.display()
            )
        })?;
        Self::from_json(&content)
            .with_context(|| format!("unable to parse job catalog {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let entries: HashMap<String, CatalogEntry> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a job name into an immutable descriptor.
    pub fn lookup(&self, name: &str) -> Result<JobDescriptor, JobError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| JobError::Lookup(name.to_string()))?;
        entry.to_descriptor(name)
    }
}

impl CatalogEntry {
    fn to_descriptor(&self, name: &str) -> Result<JobDescriptor, JobError> {
        validate_name(name)?;
        let kind: JobKind = self.kind.parse()?;
        let compression: Compression = self.compression_type.as_deref().unwrap_or("").parse()?;
        let retain = usize::try_from(self.retain).map_err(|_| {
            JobError::Configuration(format!("retain must not be negative, got {}", self.retain))
        })?;

        Ok(JobDescriptor {
            name: name.to_string(),
            source: self.source.clone(),
            destination: PathBuf::from(&self.destination),
            retain,
            verbose: self.verbose,
            kind,
            change_base_dir: self.change_dir,
            compression,
            excludes: self.excludes.clone(),
        })
    }
}

/// Names become a path component under the scratch root and the destination.
fn validate_name(name: &str) -> Result<(), JobError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(JobError::Configuration(format!(
            "invalid job name {:?}: must be a single path component",
            name
        )));
    }
    Ok(())
}
