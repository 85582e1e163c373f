use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::{saved_to, write_output};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};

/// First lines of the `count` most recently modified `.log` files
pub async fn recent_logs(call: &ValidatedCall) -> Result<String> {
    let count = call.integer("count")?;
    if count < 0 {
        return Err(DispatchError::invalid("count", "must not be negative"));
    }
    let input = call.path("input")?;
    let output = call.path("output")?;

    let files = newest_logs(input, count as usize).await?;
    let mut contents = String::new();
    for file in &files {
        contents.push_str(&first_line(file).await?);
        contents.push('\n');
    }

    write_output(output, contents).await?;
    Ok(saved_to(output))
}

async fn newest_logs(dir: &Path, count: usize) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| DispatchError::from_io(e, dir))?;

    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "log") {
            continue;
        }
        let meta = entry.metadata().await?;
        if meta.is_file() {
            logs.push((meta.modified()?, path));
        }
    }

    // Newest first; ties broken by name so the listing is stable
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(logs.into_iter().take(count).map(|(_, path)| path).collect())
}

async fn first_line(path: &Path) -> Result<String> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| DispatchError::from_io(e, path))?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}
