//! Title index over a directory tree of documents

use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::{saved_to, write_output};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_FILETYPE: &str = ".md";

pub async fn file_contents(call: &ValidatedCall) -> Result<String> {
    let filetype = match call.text("filetype")?.trim() {
        "" => DEFAULT_FILETYPE.to_string(),
        ext => ext.to_string(),
    };
    let input = call.path("input")?.to_path_buf();
    let output = call.path("output")?;

    // Directory walking is blocking; keep it off the async workers
    let index = tokio::task::spawn_blocking(move || build_index(&input, &filetype))
        .await
        .map_err(|e| DispatchError::OperationFailed(e.to_string()))??;
    debug!(entries = index.len(), "indexed documents");

    write_output(output, serde_json::to_vec(&index)?).await?;
    Ok(saved_to(output))
}

/// Map of path relative to `root` to the first `# ` heading
pub fn build_index(root: &Path, filetype: &str) -> Result<BTreeMap<String, String>> {
    let meta = std::fs::metadata(root).map_err(|e| DispatchError::from_io(e, root))?;
    if !meta.is_dir() {
        return Err(DispatchError::invalid("input", "expected a directory"));
    }

    let mut files = Vec::new();
    collect_files(root, filetype, &mut files)?;

    let mut index = BTreeMap::new();
    for file in files {
        let Ok(text) = std::fs::read_to_string(&file) else {
            continue;
        };
        if let Some(title) = text.lines().find_map(|line| line.strip_prefix("# ")) {
            let relative = file.strip_prefix(root).unwrap_or(&file);
            index.insert(
                relative.to_string_lossy().into_owned(),
                title.trim().to_string(),
            );
        }
    }
    Ok(index)
}

fn collect_files(dir: &Path, filetype: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let kind = entry.file_type()?;
        if kind.is_dir() {
            collect_files(&path, filetype, out)?;
        } else if kind.is_file() && entry.file_name().to_string_lossy().ends_with(filetype) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_index_nested_titles() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("guides/setup")).unwrap();
        std::fs::write(root.join("intro.md"), "# Introduction\nbody").unwrap();
        std::fs::write(root.join("guides/setup/install.md"), "preamble\n## Sub\n# Installing  \n").unwrap();
        std::fs::write(root.join("guides/untitled.md"), "no heading here").unwrap();
        std::fs::write(root.join("notes.txt"), "# Not markdown").unwrap();

        let index = build_index(root, ".md").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index["intro.md"], "Introduction");
        assert_eq!(
            index[Path::new("guides/setup/install.md").to_str().unwrap()],
            "Installing"
        );
    }

    #[test]
    fn test_index_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "# A").unwrap();
        assert!(matches!(
            build_index(&file, ".md"),
            Err(DispatchError::InvalidArgument { .. })
        ));
        assert!(matches!(
            build_index(&dir.path().join("missing"), ".md"),
            Err(DispatchError::NotFound(_))
        ));
    }
}
