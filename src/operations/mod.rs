//! Leaf operations the classifier can select
//!
//! Each operation reads its validated inputs, writes its output file and
//! returns a short confirmation naming where the result went.

pub mod catalog;
pub mod contacts;
pub mod dates;
pub mod docs;
pub mod extract;
pub mod logs;
pub mod similarity;
pub mod tickets;
pub mod tools;

use crate::command::validator::ValidatedCall;
use crate::core::config::DispatchConfig;
use crate::core::error::{DispatchError, Result};
use crate::llm::LanguageModel;
use crate::process::CommandRunner;
use catalog::OperationId;
use std::path::Path;

pub use catalog::{OperationRegistry, OperationSpec};

/// Collaborators available to every operation
#[derive(Clone, Copy)]
pub struct OperationContext<'a> {
    pub config: &'a DispatchConfig,
    pub model: &'a dyn LanguageModel,
    pub runner: &'a dyn CommandRunner,
}

/// Run a validated fixed operation
pub async fn execute(ctx: OperationContext<'_>, call: &ValidatedCall) -> Result<String> {
    match call.operation {
        OperationId::RetrieveData => tools::retrieve_data(ctx, call).await,
        OperationId::FormatContent => tools::format_content(ctx, call).await,
        OperationId::CountDays => dates::count_days(call).await,
        OperationId::SortContacts => contacts::sort_contacts(call).await,
        OperationId::RecentLogs => logs::recent_logs(call).await,
        OperationId::FileContents => docs::file_contents(call).await,
        OperationId::ExtractEmail => extract::extract_email(ctx, call).await,
        OperationId::ExtractCreditCard => extract::extract_credit_card(ctx, call).await,
        OperationId::EmbeddingComments => similarity::embedding_comments(ctx, call).await,
        OperationId::TicketSales => tickets::ticket_sales(call).await,
        OperationId::TaskRunner => Err(DispatchError::OperationFailed(
            "task_runner is executed through code synthesis".into(),
        )),
    }
}

/// Read a UTF-8 file, naming the path on failure
pub(crate) async fn read_text(path: &Path) -> Result<String> {
    ensure_not_dir(path).await?;
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DispatchError::from_io(e, path))
}

pub(crate) async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    ensure_not_dir(path).await?;
    tokio::fs::read(path)
        .await
        .map_err(|e| DispatchError::from_io(e, path))
}

async fn ensure_not_dir(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Err(DispatchError::IsADirectory(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) => Err(DispatchError::from_io(e, path)),
    }
}

/// Write `contents`, creating parent directories first
pub(crate) async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

pub(crate) fn saved_to(path: &Path) -> String {
    format!("Output saved to {}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_output_creates_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/out.txt");
        write_output(&target, "2").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "2");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_text(&dir.path().join("nope.txt")).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = read_text(dir.path()).await.unwrap_err();
        assert!(matches!(err, DispatchError::IsADirectory(_)));
    }
}
