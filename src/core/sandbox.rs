//! Path confinement for the shared data directory
//!
//! Every path that reaches the filesystem goes through [`Sandbox::confine`].
//! The check is lexical: outputs usually do not exist yet, so paths cannot be
//! canonicalised.

use crate::core::error::{DispatchError, Result};
use std::path::{Component, Path, PathBuf};

/// The single directory all operation I/O resolves under
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` and check it lies under the root.
    ///
    /// Relative paths are taken relative to the root. `..` segments are
    /// resolved before the prefix check, so `/data/../etc` is rejected.
    pub fn confine(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let resolved = normalize(&joined);

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(DispatchError::PathAccessDenied(path.to_path_buf()))
        }
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the filesystem root
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confine_accepts_paths_under_root() {
        let sandbox = Sandbox::new("/data");
        assert_eq!(
            sandbox.confine("/data/out.txt").unwrap(),
            PathBuf::from("/data/out.txt")
        );
        assert_eq!(
            sandbox.confine("/data/a/./b/../c.txt").unwrap(),
            PathBuf::from("/data/a/c.txt")
        );
        assert_eq!(sandbox.confine("/data").unwrap(), PathBuf::from("/data"));
    }

    #[test]
    fn test_confine_resolves_relative_paths_against_root() {
        let sandbox = Sandbox::new("/data");
        assert_eq!(
            sandbox.confine("dates.txt").unwrap(),
            PathBuf::from("/data/dates.txt")
        );
    }

    #[test]
    fn test_confine_rejects_escapes() {
        let sandbox = Sandbox::new("/data");
        for path in ["/etc/passwd", "/data/../etc/passwd", "../secret", "/datastore/x"] {
            let err = sandbox.confine(path).unwrap_err();
            assert!(
                matches!(err, DispatchError::PathAccessDenied(_)),
                "{} should be denied",
                path
            );
        }
    }

    #[test]
    fn test_root_with_trailing_components_is_normalized() {
        let sandbox = Sandbox::new("/data/./");
        assert_eq!(sandbox.root(), Path::new("/data"));
        assert!(sandbox.confine("/data/x").is_ok());
    }

    #[test]
    fn test_parent_of_filesystem_root_stays_at_root() {
        assert_eq!(normalize(Path::new("/../../etc")), PathBuf::from("/etc"));
    }

    proptest! {
        #[test]
        fn prop_confined_paths_start_with_root(segments in proptest::collection::vec("[a-z.]{1,4}", 0..6)) {
            let sandbox = Sandbox::new("/data");
            let candidate = format!("/data/{}", segments.join("/"));
            if let Ok(resolved) = sandbox.confine(&candidate) {
                prop_assert!(resolved.starts_with("/data"));
            }
        }

        #[test]
        fn prop_paths_outside_root_are_denied(name in "[a-z]{1,8}") {
            prop_assume!(name != "data");
            let sandbox = Sandbox::new("/data");
            let candidate = format!("/{}/file.txt", name);
            prop_assert!(sandbox.confine(&candidate).is_err());
        }
    }
}
