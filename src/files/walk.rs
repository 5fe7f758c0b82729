//! Recursive discovery of candidate files.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace, warn};
use walkdir::{DirEntry, WalkDir};

use super::SourceError;

/// Lists every regular file under `root` whose extension is allow-listed.
///
/// Symlinks to files are listed; symlinked directories are not descended.
///
/// Extensions are compared case-insensitively and may be given with or
/// without the leading dot. Within each directory, files come before
/// subdirectories and both are sorted by name, so the order is stable for a
/// given tree. Unreadable entries below the root are logged and skipped.
///
/// # Errors
///
/// Returns [`SourceError::MissingRoot`] if `root` is not a directory.
#[instrument(skip(allowed_extensions), fields(root = %root.display()))]
pub fn list_files_recursively(
    root: &Path,
    allowed_extensions: &[String],
) -> Result<Vec<PathBuf>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by(files_first_then_name) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(error = %error, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            trace!(dir = %entry.path().display(), "reading directory");
            continue;
        }

        // `DirEntry::file_type` does not follow links; `Path::is_file` does.
        if entry.path().is_file() && has_allowed_extension(entry.path(), allowed_extensions) {
            files.push(entry.into_path());
        }
    }

    debug!(count = files.len(), "collected candidate files");
    Ok(files)
}

fn files_first_then_name(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

pub(crate) fn has_allowed_extension(path: &Path, allowed_extensions: &[String]) -> bool {
    let Some(extension) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    allowed_extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn csv_only() -> Vec<String> {
        vec![".csv".to_string()]
    }

    #[test]
    fn test_has_allowed_extension_case_insensitive_with_or_without_dot() {
        assert!(has_allowed_extension(Path::new("a/b.CSV"), &csv_only()));
        assert!(has_allowed_extension(Path::new("b.csv"), &["csv".to_string()]));
        assert!(!has_allowed_extension(Path::new("b.txt"), &csv_only()));
        assert!(!has_allowed_extension(Path::new("csv"), &csv_only()));
    }

    #[test]
    fn test_list_files_filters_by_extension_at_any_depth() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("guild/channel/deeper")).unwrap();
        fs::write(root.join("top.csv"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("guild/channel/log.csv"), "").unwrap();
        fs::write(root.join("guild/channel/avatar.png"), "").unwrap();
        fs::write(root.join("guild/channel/deeper/old.csv"), "").unwrap();

        let files = list_files_recursively(root, &csv_only()).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("top.csv"),
                PathBuf::from("guild/channel/log.csv"),
                PathBuf::from("guild/channel/deeper/old.csv"),
            ]
        );
    }

    #[test]
    fn test_list_files_orders_files_before_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a_dir")).unwrap();
        fs::write(root.join("a_dir/inner.csv"), "").unwrap();
        fs::write(root.join("z.csv"), "").unwrap();

        let files = list_files_recursively(root, &csv_only()).unwrap();
        assert_eq!(files, vec![root.join("z.csv"), root.join("a_dir/inner.csv")]);
    }

    #[test]
    fn test_list_files_ignores_directories_named_like_candidates() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("export.csv")).unwrap();

        let files = list_files_recursively(temp_dir.path(), &csv_only()).unwrap();
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_includes_symlinked_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("data");
        fs::create_dir_all(&root).unwrap();
        let target = temp_dir.path().join("elsewhere.csv");
        fs::write(&target, "").unwrap();
        std::os::unix::fs::symlink(&target, root.join("linked.csv")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone.csv"), root.join("dangling.csv")).unwrap();

        let files = list_files_recursively(&root, &csv_only()).unwrap();
        assert_eq!(files, vec![root.join("linked.csv")]);
    }

    #[test]
    fn test_list_files_missing_root_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let result = list_files_recursively(&missing, &csv_only());
        assert!(matches!(result, Err(SourceError::MissingRoot { .. })));
    }
}
