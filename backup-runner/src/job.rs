//! Job descriptors: one fully-resolved, immutable backup task.

use crate::utils::JobError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How a job produces its archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Archive a local directory with tar.
    Archive,
    /// Pull a remote tree into the scratch root with rsync, then archive it.
    SyncThenArchive,
}

impl FromStr for JobKind {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tar" => Ok(JobKind::Archive),
            "rsync" => Ok(JobKind::SyncThenArchive),
            other => Err(JobError::Configuration(format!(
                "invalid backup type: {:?} (supported: tar, rsync)",
                other
            ))),
        }
    }
}

/// Compression applied by tar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// File extension of artifacts produced with this compression.
    pub fn extension(self) -> &'static str {
        match self {
            Compression::Gzip => "tar.gz",
            Compression::Bzip2 => "tar.bz2",
            Compression::Xz => "tar.xz",
            Compression::Zstd => "tar.zst",
        }
    }

    /// Letter inserted into tar's short flag cluster, if any.
    pub fn short_flag(self) -> Option<char> {
        match self {
            Compression::Gzip | Compression::Zstd => None,
            Compression::Bzip2 => Some('j'),
            Compression::Xz => Some('J'),
        }
    }

    /// Long-form flag placed before the flag cluster, if any.
    pub fn long_flag(self) -> Option<&'static str> {
        match self {
            Compression::Zstd => Some("--zstd"),
            _ => None,
        }
    }
}

impl FromStr for Compression {
    type Err = JobError;

    /// An empty string selects the default (gzip).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "gzip" => Ok(Compression::Gzip),
            "bzip2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            "zstd" => Ok(Compression::Zstd),
            other => Err(JobError::Configuration(format!(
                "invalid compression type: {} (supported: gzip, bzip2, xz, zstd)",
                other
            ))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// A single backup task, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub name: String,

    /// Local path, or `user@host:/path` for sync jobs
    pub source: String,

    pub destination: PathBuf,

    /// Maximum number of artifacts kept after a successful run
    pub retain: usize,

    pub verbose: bool,
    pub kind: JobKind,

    /// Archive entries relative to `source` (tar `-C`)
    pub change_base_dir: bool,

    pub compression: Compression,

    /// Glob patterns handed to the tool, in order
    pub excludes: Vec<String>,
}

impl JobDescriptor {
    /// Local archive job rooted at `source` (`-C`), gzip, no excludes.
    #[cfg(test)]
    pub(crate) fn archive(
        name: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<PathBuf>,
        retain: usize,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
            retain,
            verbose: false,
            kind: JobKind::Archive,
            change_base_dir: true,
            compression: Compression::Gzip,
            excludes: Vec::new(),
        }
    }
}
