//! Task Dispatch - Entry Point
//!
//! Loads configuration, wires the model and process collaborators into a
//! dispatcher and serves the HTTP API.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use task_dispatch::command::Dispatcher;
use task_dispatch::core::config::{DispatchConfig, NoMatchPolicy};
use task_dispatch::core::error::{DispatchError, Result};
use task_dispatch::llm::HttpLanguageModel;
use task_dispatch::operations::OperationRegistry;
use task_dispatch::process::SystemRunner;
use task_dispatch::server;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "task-dispatch")]
#[command(about = "Run natural-language tasks against a sandboxed data directory")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8000
    #[arg(long)]
    bind: Option<String>,

    /// Directory every operation is confined to
    #[arg(long)]
    sandbox_root: Option<PathBuf>,

    /// What to do when no operation matches
    #[arg(long, value_enum)]
    no_match_policy: Option<NoMatchPolicy>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("task_dispatch=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let bind: SocketAddr = config.server.bind.parse().map_err(|e| {
        DispatchError::Config(format!("Invalid bind address {}: {}", config.server.bind, e))
    })?;

    tracing::info!(
        root = %config.sandbox.root.display(),
        model = %config.llm.model,
        policy = ?config.dispatch.no_match_policy,
        "Starting Task Dispatch"
    );

    let model = HttpLanguageModel::new(&config.llm)?;
    let dispatcher = Dispatcher::new(
        Arc::new(config),
        Arc::new(OperationRegistry::builtin()),
        Arc::new(model),
        Arc::new(SystemRunner),
    );

    server::serve(Arc::new(dispatcher), bind).await
}

/// File, then environment, then command-line flags
fn load_config(args: &Args) -> Result<DispatchConfig> {
    let mut config = DispatchConfig::load(args.config.as_deref())?;
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(root) = &args.sandbox_root {
        config.sandbox.root = root.clone();
    }
    if let Some(policy) = args.no_match_policy {
        config.dispatch.no_match_policy = policy;
    }
    config.validate()?;
    Ok(config)
}
