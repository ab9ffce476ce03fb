//! Deterministic artifact naming.
//!
//! Artifacts are named `<job>_<YYYY.MM.DD_HH.MM.SS>.<ext>`. The timestamp is
//! fixed-width and most-significant first, so lexical order of one job's
//! artifact names is chronological order.

use crate::job::Compression;
use chrono::NaiveDateTime;

/// chrono format of the timestamp embedded in artifact names
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

/// Rendered width of [`TIMESTAMP_FORMAT`]; every field is zero-padded.
const TIMESTAMP_LEN: usize = 19;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    job: String,
    timestamp: NaiveDateTime,
    compression: Compression,
}

impl ArtifactName {
    pub fn new(job: &str, timestamp: NaiveDateTime, compression: Compression) -> Self {
        Self {
            job: job.to_string(),
            timestamp,
            compression,
        }
    }

    pub fn stamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.job, self.stamp(), self.compression.extension())
    }

    /// Prefix and suffix for the scratch file tar writes into.
    pub fn temp_affixes(&self) -> (String, String) {
        (
            format!("backup-runner_{}_{}_", self.job, self.stamp()),
            format!(".{}", self.compression.extension()),
        )
    }

    /// Recover the timestamp from a file name belonging to `job`.
    ///
    /// Returns `None` for anything that is not exactly an artifact of `job`
    /// with `compression`, including artifacts of jobs whose name merely
    /// starts with `job_`.
    pub fn parse_timestamp(
        file_name: &str,
        job: &str,
        compression: Compression,
    ) -> Option<NaiveDateTime> {
        let stamp = file_name
            .strip_prefix(job)?
            .strip_prefix('_')?
            .strip_suffix(compression.extension())?
            .strip_suffix('.')?;
        // chrono accepts unpadded fields, which would break lexical ordering
        if stamp.len() != TIMESTAMP_LEN {
            return None;
        }
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }
}
