//! Decides whether a finished tool run is fatal.
//!
//! tar exits with 1 when a file changed while it was being read. On a live
//! tree that is expected and the archive is still usable, so exactly that
//! case is let through. Everything else, and every rsync failure, is fatal.

use super::ExecOutput;

/// tar's "some files differ" exit status
pub const TAR_WARNING_EXIT: i32 = 1;

/// The one tar warning that does not invalidate the archive
pub const FILE_CHANGED_WARNING: &str = "file changed as we read it";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Non-zero exit that still produced a valid archive
    Benign,
    Fatal,
}

impl Outcome {
    pub fn is_fatal(self) -> bool {
        self == Outcome::Fatal
    }
}

/// Classify a tar run.
pub fn classify_archive(out: &ExecOutput) -> Outcome {
    if out.success() {
        Outcome::Success
    } else if out.exit_code == TAR_WARNING_EXIT && only_file_changed_warnings(&out.output) {
        Outcome::Benign
    } else {
        Outcome::Fatal
    }
}

/// Classify an rsync run. There is no benign failure.
pub fn classify_sync(out: &ExecOutput) -> Outcome {
    if out.success() {
        Outcome::Success
    } else {
        Outcome::Fatal
    }
}

/// True when there is at least one non-blank line and every non-blank line
/// is a "file changed as we read it" warning.
fn only_file_changed_warnings(output: &str) -> bool {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    lines.peek().is_some() && lines.all(|l| l.contains(FILE_CHANGED_WARNING))
}
