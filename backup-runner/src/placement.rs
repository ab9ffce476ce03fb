//! Moves a finished archive into its destination without ever exposing a
//! partially written file under the final name.
//!
//! The archive is written to a scratch [`TempPath`] first. Placement renames
//! it into place; when scratch and destination are on different filesystems
//! the bytes are copied into a hidden partial file next to the final name,
//! which is then renamed within the destination filesystem.

use crate::utils::PlacementError;
use std::fs::File;
use std::io;
use std::path::Path;
use tempfile::{PathPersistError, TempPath};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Renamed,
    /// Cross-device fallback
    Copied,
}

/// `rename(2)` refuses to cross filesystems.
pub fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::EXDEV as i32)
}

/// Move `temp` to `dest`.
///
/// On any error the scratch file is removed when `temp` is dropped.
pub fn place(temp: TempPath, dest: &Path) -> Result<Placement, PlacementError> {
    match temp.persist(dest) {
        Ok(()) => {
            info!("Backup successfully moved to: {}", dest.display());
            Ok(Placement::Renamed)
        }
        Err(PathPersistError { error, path }) if is_cross_device(&error) => {
            info!("Cross-device move detected, copying file instead...");
            copy_into_place(path, dest)
        }
        Err(PathPersistError { error, .. }) => Err(PlacementError::Rename {
            dest: dest.to_path_buf(),
            source: error,
        }),
    }
}

/// Copy fallback: stage next to `dest`, preserve mode and mtime, fsync,
/// rename, then delete the scratch file.
pub(crate) fn copy_into_place(temp: TempPath, dest: &Path) -> Result<Placement, PlacementError> {
    stage_copy(&temp, dest).map_err(|source| PlacementError::Copy {
        dest: dest.to_path_buf(),
        source,
    })?;

    let temp_display = temp.display().to_string();
    if let Err(e) = temp.close() {
        warn!("Failed to remove temporary file {}: {}", temp_display, e);
    }

    info!("Backup successfully copied to: {}", dest.display());
    Ok(Placement::Copied)
}

fn stage_copy(src: &Path, dest: &Path) -> io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut source = File::open(src)?;
    let metadata = source.metadata()?;

    // Hidden and suffixed, so it never matches an artifact pattern
    let mut partial = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".partial")
        .tempfile_in(dir)?;

    io::copy(&mut source, partial.as_file_mut())?;
    partial.as_file().set_permissions(metadata.permissions())?;

    if let Err(e) = metadata
        .modified()
        .and_then(|mtime| partial.as_file().set_modified(mtime))
    {
        warn!("Failed to preserve timestamps on {}: {}", dest.display(), e);
    }

    partial.as_file().sync_all()?;
    partial.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, SystemTime};
    use tempfile::{tempdir, NamedTempFile};

    fn scratch_archive(dir: &Path, content: &[u8]) -> TempPath {
        let mut file = NamedTempFile::new_in(dir).unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file.into_temp_path()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_cross_device_detection() {
        let exdev = io::Error::from_raw_os_error(nix::errno::Errno::EXDEV as i32);
        assert!(is_cross_device(&exdev));

        let enoent = io::Error::from_raw_os_error(nix::errno::Errno::ENOENT as i32);
        assert!(!is_cross_device(&enoent));
        assert!(!is_cross_device(&io::Error::new(io::ErrorKind::Other, "x")));
    }

    #[test]
    fn test_rename_into_destination() {
        let scratch = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let temp = scratch_archive(scratch.path(), b"archive bytes");
        let temp_path = temp.to_path_buf();
        let dest = dest_dir.path().join("db_2024.01.15_14.30.45.tar.gz");

        assert_eq!(place(temp, &dest).unwrap(), Placement::Renamed);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive bytes");
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_copy_fallback_is_faithful() {
        let scratch = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let content: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let temp = scratch_archive(scratch.path(), &content);
        let temp_path = temp.to_path_buf();

        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o640)).unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        File::options()
            .write(true)
            .open(&temp_path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let dest = dest_dir.path().join("db_2024.01.15_14.30.45.tar.gz");
        assert_eq!(copy_into_place(temp, &dest).unwrap(), Placement::Copied);

        assert_eq!(std::fs::read(&dest).unwrap(), content);
        let meta = std::fs::metadata(&dest).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o640);
        assert_eq!(meta.modified().unwrap(), mtime);

        assert!(!temp_path.exists());
        assert_eq!(dir_entries(dest_dir.path()), vec!["db_2024.01.15_14.30.45.tar.gz"]);
    }

    #[test]
    fn test_failed_rename_removes_scratch_file() {
        let scratch = tempdir().unwrap();
        let temp = scratch_archive(scratch.path(), b"data");
        let temp_path = temp.to_path_buf();
        let dest = scratch.path().join("missing-dir").join("db.tar.gz");

        let err = place(temp, &dest).unwrap_err();
        assert!(matches!(err, PlacementError::Rename { .. }));
        assert!(!temp_path.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_failed_copy_leaves_no_partial_file() {
        let scratch = tempdir().unwrap();
        let temp = scratch_archive(scratch.path(), b"data");
        let temp_path = temp.to_path_buf();
        let dest = scratch.path().join("missing-dir").join("db.tar.gz");

        let err = copy_into_place(temp, &dest).unwrap_err();
        assert!(matches!(err, PlacementError::Copy { .. }));
        assert!(!temp_path.exists());
        assert!(!dest.exists());
    }
}
