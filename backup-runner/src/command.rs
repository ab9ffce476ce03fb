//! tar and rsync invocation construction.
//!
//! Commands are built as an ordered list of discrete arguments and only
//! rendered to a shell string at the execution boundary, so every
//! interpolated value goes through [`shell_quote`] exactly once.

use crate::job::JobDescriptor;
use std::fmt;
use std::path::Path;

/// Remote shell used by rsync: non-interactive, no host key prompts, quiet.
pub const SSH_TRANSPORT: &str =
    "ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -o LogLevel=ERROR";

/// Quote a literal for a POSIX shell.
///
/// Wraps the value in single quotes; each embedded `'` becomes `'\''`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Emitted verbatim
    Raw(String),
    /// Shell-quoted when rendered
    Value(String),
    /// Verbatim prefix immediately followed by a quoted value, e.g. `--exclude='x'`
    Joined(&'static str, String),
}

impl Arg {
    fn render(&self) -> String {
        match self {
            Arg::Raw(s) => s.clone(),
            Arg::Value(v) => shell_quote(v),
            Arg::Joined(prefix, v) => format!("{}{}", prefix, shell_quote(v)),
        }
    }
}

/// A program plus its arguments, rendered for `sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: &'static str,
    args: Vec<Arg>,
}

impl CommandLine {
    pub fn new(program: &'static str) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    pub fn raw(mut self, s: impl Into<String>) -> Self {
        self.args.push(Arg::Raw(s.into()));
        self
    }

    pub fn value(mut self, v: impl Into<String>) -> Self {
        self.args.push(Arg::Value(v.into()));
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }

    pub fn render(&self) -> String {
        let mut out = String::from(self.program);
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.render());
        }
        out
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One `--exclude=<pattern>` per pattern, in order.
pub fn exclude_args(excludes: &[String]) -> Vec<Arg> {
    excludes
        .iter()
        .map(|pattern| Arg::Joined("--exclude=", pattern.clone()))
        .collect()
}

/// `tar [--exclude=..]* [--zstd] -c[j|J][v]f <archive> [-C ]<source> .`
///
/// `source` is the effective source, which differs from `job.source` for
/// sync-then-archive jobs.
pub fn tar_command(job: &JobDescriptor, source: &str, archive: &Path) -> CommandLine {
    let mut cluster = String::from("-c");
    if let Some(letter) = job.compression.short_flag() {
        cluster.push(letter);
    }
    if job.verbose {
        cluster.push('v');
    }
    cluster.push('f');

    let mut cmd = CommandLine::new("tar").args(exclude_args(&job.excludes));
    if let Some(long) = job.compression.long_flag() {
        cmd = cmd.raw(long);
    }
    cmd = cmd.raw(cluster).value(archive.to_string_lossy());
    if job.change_base_dir {
        cmd = cmd.raw("-C");
    }
    cmd.value(source).raw(".")
}

/// `rsync [--exclude=..]* -rah[v]z --delete -e '<ssh>' <source> <staging>`
pub fn rsync_command(job: &JobDescriptor, staging: &Path) -> CommandLine {
    let flags = if job.verbose { "-rahvz" } else { "-rahz" };

    CommandLine::new("rsync")
        .args(exclude_args(&job.excludes))
        .raw(flags)
        .raw("--delete")
        .raw("-e")
        .value(SSH_TRANSPORT)
        .value(job.source.as_str())
        .value(staging.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor;
    use crate::job::{Compression, JobKind};
    use std::path::PathBuf;

    fn job(compression: Compression, verbose: bool, change_dir: bool) -> JobDescriptor {
        JobDescriptor {
            verbose,
            change_base_dir: change_dir,
            compression,
            ..JobDescriptor::archive("test_backup", "/source/path", "/dest", 3)
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("simple"), "'simple'");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("*.log"), "'*.log'");
    }

    #[test]
    fn test_tar_command_per_compression() {
        let tmp = Path::new("/tmp/archive.tmp");
        let cases = [
            (Compression::Gzip, false, "tar -cf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Gzip, true, "tar -cvf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Bzip2, false, "tar -cjf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Bzip2, true, "tar -cjvf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Xz, false, "tar -cJf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Xz, true, "tar -cJvf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Zstd, false, "tar --zstd -cf '/tmp/archive.tmp' -C '/source/path' ."),
            (Compression::Zstd, true, "tar --zstd -cvf '/tmp/archive.tmp' -C '/source/path' ."),
        ];

        for (compression, verbose, expected) in cases {
            let cmd = tar_command(&job(compression, verbose, true), "/source/path", tmp);
            assert_eq!(cmd.render(), expected, "{} verbose={}", compression, verbose);
        }
    }

    #[test]
    fn test_tar_compression_flag_appears_once() {
        let tmp = Path::new("/tmp/x");
        for (compression, marker) in [
            (Compression::Bzip2, "j"),
            (Compression::Xz, "J"),
            (Compression::Zstd, "--zstd"),
        ] {
            let cmd = tar_command(&job(compression, true, true), "/src", tmp);
            let hits = cmd
                .arguments()
                .iter()
                .filter(|a| matches!(a, Arg::Raw(s) if s.contains(marker)))
                .count();
            assert_eq!(hits, 1, "{}", compression);
        }
    }

    #[test]
    fn test_tar_without_change_dir() {
        let cmd = tar_command(&job(Compression::Gzip, false, false), "/data", Path::new("/t"));
        assert_eq!(cmd.render(), "tar -cf '/t' '/data' .");
    }

    #[test]
    fn test_tar_excludes_precede_flags() {
        let mut j = job(Compression::Gzip, false, true);
        j.excludes = vec!["*.log".to_string(), "cache".to_string()];
        let cmd = tar_command(&j, "/src", Path::new("/t"));
        assert_eq!(
            cmd.render(),
            "tar --exclude='*.log' --exclude='cache' -cf '/t' -C '/src' ."
        );
    }

    #[test]
    fn test_tar_quotes_hostile_source() {
        let cmd = tar_command(&job(Compression::Gzip, false, true), "/data/it's here; rm -rf /", Path::new("/t"));
        assert_eq!(
            cmd.render(),
            r"tar -cf '/t' -C '/data/it'\''s here; rm -rf /' ."
        );
    }

    #[test]
    fn test_rsync_command() {
        let mut j = job(Compression::Gzip, false, false);
        j.kind = JobKind::SyncThenArchive;
        j.source = "user@host:/path".to_string();
        let staging = PathBuf::from("/tmp/test_backup");

        assert_eq!(
            rsync_command(&j, &staging).render(),
            "rsync -rahz --delete -e 'ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -o LogLevel=ERROR' 'user@host:/path' '/tmp/test_backup'"
        );

        j.verbose = true;
        j.excludes = vec!["*.tmp".to_string()];
        assert_eq!(
            rsync_command(&j, &staging).render(),
            "rsync --exclude='*.tmp' -rahvz --delete -e 'ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -o LogLevel=ERROR' 'user@host:/path' '/tmp/test_backup'"
        );
    }

    #[tokio::test]
    async fn test_excludes_survive_shell_parsing() {
        let patterns: Vec<String> = [
            "*.log",
            "dir with spaces/",
            "it's a file",
            "[abc]?*",
            "$HOME `whoami` $(id)",
            "\"double\" 'single'",
            "back\\slash",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let cmd = CommandLine::new("printf")
            .value("%s\n")
            .args(exclude_args(&patterns));
        let out = executor::run(&cmd).await.unwrap();
        assert_eq!(out.exit_code, 0);

        let tokens: Vec<&str> = out.output.lines().collect();
        assert_eq!(tokens.len(), patterns.len());
        for (token, pattern) in tokens.iter().zip(&patterns) {
            assert_eq!(*token, format!("--exclude={}", pattern));
        }
    }
}
