//! Operations that delegate to external command-line tools

use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::OperationContext;
use crate::process::{split_command, ProcessOutput};
use regex::Regex;
use tracing::{info, warn};

/// `prettier` or `prettier@<version>`; nothing else reaches the package runner
const PRETTIER_PATTERN: &str = r"^prettier(@[\w.\-]+)?$";

/// Run a remote script with the user's email, from the sandbox root
pub async fn retrieve_data(ctx: OperationContext<'_>, call: &ValidatedCall) -> Result<String> {
    let url = call.text("url")?;
    let email = call.text("email")?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(DispatchError::invalid("url", "expected an http(s) url"));
    }

    let tools = &ctx.config.tools;
    let (program, prefix) = split_command(&tools.retrieve_runner)?;
    let mut args = prefix.to_vec();
    args.push(url.to_string());
    args.push(email.to_string());

    info!(%url, "retrieving data");
    let output = ctx
        .runner
        .run(program, &args, Some(ctx.config.sandbox.root.as_path()), tools.timeout())
        .await?;
    check(program, output)?;
    Ok(format!("Data retrieved from {}", url))
}

/// Format a file in place with prettier
pub async fn format_content(ctx: OperationContext<'_>, call: &ValidatedCall) -> Result<String> {
    let input = call.path("input")?;
    let tools = &ctx.config.tools;
    let prettier = call
        .optional_text("prettier")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&tools.default_prettier);
    let accepted = Regex::new(PRETTIER_PATTERN)
        .map(|re| re.is_match(prettier))
        .unwrap_or(false);
    if !accepted {
        warn!(%prettier, "refusing formatter package");
        return Err(DispatchError::invalid(
            "prettier",
            format!("'{}' is not a prettier release", prettier),
        ));
    }

    if !input.is_file() {
        return Err(DispatchError::NotFound(input.to_path_buf()));
    }

    let (program, prefix) = split_command(&tools.formatter)?;
    let mut args = prefix.to_vec();
    args.push(prettier.to_string());
    args.push("--write".to_string());
    args.push(input.to_string_lossy().into_owned());

    info!(%prettier, input = %input.display(), "formatting");
    let output = ctx.runner.run(program, &args, None, tools.timeout()).await?;
    check(program, output)?;
    Ok(format!("Formatted {}", input.display()))
}

fn check(program: &str, output: ProcessOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    warn!(program, status = ?output.status, "tool failed");
    let detail = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };
    Err(DispatchError::OperationFailed(format!(
        "{} exited with {:?}: {}",
        program,
        output.status,
        detail.trim()
    )))
}
