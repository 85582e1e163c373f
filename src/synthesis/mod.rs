//! Code-synthesis fallback
//!
//! Asks the model for a script, persists it inside the sandbox, installs its
//! declared dependencies and runs it. Everything before the run is a
//! deterministic parse or check, so the only uncontrolled step always works
//! on a known file with a known dependency set.

pub mod dependencies;
pub mod script;

use crate::core::error::{DispatchError, Result};
use crate::core::sandbox::Sandbox;
use crate::operations::{write_output, OperationContext};
use crate::process::split_command;
use dependencies::PackagePolicy;
use script::{build_prompt, GeneratedScript, SYNTHESIS_SYSTEM_PROMPT};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What the synthesized script is asked to do
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    pub task: &'a str,
    pub input: Option<&'a Path>,
    pub output: Option<&'a Path>,
}

pub async fn synthesize(
    ctx: OperationContext<'_>,
    sandbox: &Sandbox,
    request: &SynthesisRequest<'_>,
) -> Result<String> {
    let settings = &ctx.config.synthesis;

    let prompt = build_prompt(request.task, request.input, request.output);
    let reply = ctx.model.complete(SYNTHESIS_SYSTEM_PROMPT, &prompt).await?;
    let script = GeneratedScript::parse(&reply, &settings.default_filename);

    let destination = script_path(sandbox, &script.filename)?;
    write_output(&destination, &script.body).await?;
    info!(
        script = %destination.display(),
        dependencies = ?script.dependencies,
        "persisted generated script"
    );

    let packages = PackagePolicy::new(settings).plan(&script.dependencies)?;
    install(ctx, sandbox, &destination, &packages).await?;

    let (program, prefix) = split_command(&settings.interpreter)?;
    let mut args = prefix.to_vec();
    args.push(destination.to_string_lossy().into_owned());
    args.extend(path_arguments(&script, "--input", request.input));
    args.extend(path_arguments(&script, "--output", request.output));

    let command_line = render_command(program, &args);
    info!(command = %command_line, "running generated script");
    let output = ctx
        .runner
        .run(program, &args, Some(sandbox.root()), settings.run_timeout())
        .await?;

    if !output.success() {
        warn!(status = ?output.status, "generated script failed");
        return Err(DispatchError::GeneratedCodeExecutionFailed {
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(format!("Executed {}", command_line))
}

/// Install each package once; the first failure stops the request
async fn install(
    ctx: OperationContext<'_>,
    sandbox: &Sandbox,
    script: &Path,
    packages: &[String],
) -> Result<()> {
    let settings = &ctx.config.synthesis;
    let (program, prefix) = split_command(&settings.installer)?;
    for package in packages {
        let mut args = prefix.to_vec();
        args.push(package.clone());
        info!(%package, script = %script.display(), "installing dependency");
        let output = ctx
            .runner
            .run(program, &args, Some(sandbox.root()), settings.install_timeout())
            .await?;
        if !output.success() {
            warn!(%package, status = ?output.status, "dependency install failed");
            return Err(DispatchError::DependencyInstallFailed {
                dependency: package.clone(),
                stderr: output.stderr.trim().to_string(),
            });
        }
    }
    Ok(())
}

/// `--flag path` when the script parses the flag itself, else the bare path
fn path_arguments(script: &GeneratedScript, flag: &str, path: Option<&Path>) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };
    let path = path.to_string_lossy().into_owned();
    if script.references_flag(flag) {
        vec![flag.to_string(), path]
    } else {
        vec![path]
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Where a script with `filename` would be persisted
pub fn script_path(sandbox: &Sandbox, filename: &str) -> Result<PathBuf> {
    sandbox.confine(sandbox.root().join(filename))
}
