//! Path normalization and root validation
//!
//! Identities are lexically normalized absolute paths: `.` and `..`
//! components are resolved without touching the filesystem, so a path keeps
//! the same identity whether or not it currently exists. Symlinks are not
//! resolved; a link file discovered under two spellings of the same mount
//! is out of scope for deduplication.

use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub enum ScanPathError {
    NotFound(PathBuf),
    NotDirectory(PathBuf),
    NotReadable(PathBuf),
}

impl fmt::Display for ScanPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPathError::NotFound(path) => write!(f, "Path not found: {}", path.display()),
            ScanPathError::NotDirectory(path) => write!(f, "Not a directory: {}", path.display()),
            ScanPathError::NotReadable(path) => {
                write!(f, "Cannot read directory: {}", path.display())
            }
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_scan_path(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(path));
        }
    }
    path.to_path_buf()
}

/// Make a path absolute and resolve `.`/`..` components lexically.
pub fn absolute_lexical(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// The deduplication key for a file: lexically normalized absolute path,
/// case-folded on case-insensitive filesystems.
pub fn normalized_identity(path: &Path) -> String {
    let abs = absolute_lexical(path);
    let s = abs.to_string_lossy().into_owned();
    if cfg!(windows) {
        s.to_lowercase()
    } else {
        s
    }
}

/// Whether `target` lies under any of the configured roots.
pub fn is_within_any_root(target: &Path, roots: &[PathBuf]) -> bool {
    let t = absolute_lexical(target);
    roots
        .iter()
        .any(|r| t.starts_with(absolute_lexical(r)))
}

/// Path relative to the nearest root that contains it, or the full path
/// when no root does.
pub fn safe_relpath(path: &Path, roots: &[PathBuf]) -> String {
    for root in roots {
        if let Ok(rel) = path.strip_prefix(root) {
            return rel.to_string_lossy().into_owned();
        }
    }
    path.to_string_lossy().into_owned()
}

/// Lower-cased extension with its leading dot, or empty when absent.
pub fn ext_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None => String::new(),
    }
}

/// Validate that a configured root exists, is a directory, and is readable.
pub fn validate_scan_path(path: &Path) -> Result<(), ScanPathError> {
    if !path.exists() {
        return Err(ScanPathError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ScanPathError::NotDirectory(path.to_path_buf()));
    }
    if std::fs::read_dir(path).is_err() {
        return Err(ScanPathError::NotReadable(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_lexical_resolves_dots() {
        let p = absolute_lexical(Path::new("/data/sub/../docs/./file.md"));
        assert_eq!(p, PathBuf::from("/data/docs/file.md"));
    }

    #[test]
    fn identity_is_stable_for_equivalent_spellings() {
        let a = normalized_identity(Path::new("/data/docs/file.md"));
        let b = normalized_identity(Path::new("/data/./docs/sub/../file.md"));
        assert_eq!(a, b);
    }

    #[test]
    fn within_root_checks_prefix() {
        let roots = vec![PathBuf::from("/data/docs")];
        assert!(is_within_any_root(Path::new("/data/docs/a/b.md"), &roots));
        assert!(!is_within_any_root(Path::new("/data/other/b.md"), &roots));
        // prefix must be component-wise, not string-wise
        assert!(!is_within_any_root(Path::new("/data/docs2/b.md"), &roots));
    }

    #[test]
    fn safe_relpath_prefers_containing_root() {
        let roots = vec![PathBuf::from("/kb/a"), PathBuf::from("/kb/b")];
        assert_eq!(
            safe_relpath(Path::new("/kb/b/x/doc.md"), &roots),
            "x/doc.md"
        );
        assert_eq!(
            safe_relpath(Path::new("/elsewhere/doc.md"), &roots),
            "/elsewhere/doc.md"
        );
    }

    #[test]
    fn ext_of_forms() {
        assert_eq!(ext_of(Path::new("/a/b/Spec.DOCX")), ".docx");
        assert_eq!(ext_of(Path::new("/a/b/README")), "");
        assert_eq!(ext_of(Path::new("/a/b/archive.tar.gz")), ".gz");
    }

    #[test]
    fn validate_missing_path() {
        let err = validate_scan_path(Path::new("/nonexistent/shelfmark-test")).unwrap_err();
        assert!(matches!(err, ScanPathError::NotFound(_)));
    }
}
