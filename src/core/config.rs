//! Service configuration with documented defaults
//!
//! Loaded once at startup (TOML file, then environment, then CLI flags) and
//! shared read-only with every component.

use crate::core::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub server: ServerConfig,
    pub sandbox: SandboxConfig,
    pub llm: LlmConfig,
    pub dispatch: DispatchPolicy,
    pub synthesis: SynthesisConfig,
    pub tools: ToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Absolute directory every operation reads from and writes to
    pub root: PathBuf,

    /// Apply the same confinement to `/read` and `/files`
    pub confine_read_endpoints: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/data"),
            confine_read_endpoints: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat completions endpoint. Anthropic URLs switch the wire format.
    pub api_url: String,
    pub model: String,
    /// OpenAI-compatible embeddings endpoint
    pub embeddings_url: String,
    pub embedding_model: String,
    /// Upper bound for a single provider round trip
    pub timeout_secs: u64,

    /// Never read from the config file; filled from `LLM_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            embeddings_url: "https://api.openai.com/v1/embeddings".into(),
            embedding_model: "text-embedding-3-small".into(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What happens when the classifier selects no operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchPolicy {
    /// Generate and run a script for the task
    Synthesize,
    /// Fail the request with 400
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchPolicy {
    pub no_match_policy: NoMatchPolicy,
    /// Run the language gate before classification
    pub translate: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            no_match_policy: NoMatchPolicy::Synthesize,
            translate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Program (plus leading args) that runs a generated script
    pub interpreter: Vec<String>,
    /// Program (plus leading args) that installs one package
    pub installer: Vec<String>,
    /// Used when the model does not declare a usable filename
    pub default_filename: String,
    pub install_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Packages that are never installed
    pub blocked_packages: Vec<String>,
    /// When non-empty, the only packages that may be installed
    pub allowed_packages: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            interpreter: vec!["uv".into(), "run".into()],
            installer: vec![
                "uv".into(),
                "pip".into(),
                "install".into(),
                "--system".into(),
            ],
            default_filename: "generated_script.py".into(),
            install_timeout_secs: 300,
            run_timeout_secs: 120,
            blocked_packages: vec![
                "pyautogui".into(),
                "pynput".into(),
                "keyboard".into(),
                "mouse".into(),
            ],
            allowed_packages: Vec::new(),
        }
    }
}

impl SynthesisConfig {
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// External tools behind the `retrieve_data` and `format_content` operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub retrieve_runner: Vec<String>,
    pub formatter: Vec<String>,
    pub default_prettier: String,
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            retrieve_runner: vec!["uv".into(), "run".into()],
            formatter: vec!["npx".into(), "--yes".into()],
            default_prettier: "prettier@3.4.2".into(),
            timeout_secs: 120,
        }
    }
}

impl ToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DispatchConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DispatchError::Config(format!("Invalid TOML: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from an optional file, then apply environment overrides
    ///
    /// Recognised: LLM_API_KEY (or AIPROXY_TOKEN), LLM_API_URL, LLM_MODEL,
    /// DATA_ROOT.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (injectable for tests)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("LLM_API_KEY").or_else(|| lookup("AIPROXY_TOKEN")) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("LLM_API_URL") {
            self.llm.api_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(root) = lookup("DATA_ROOT") {
            self.sandbox.root = PathBuf::from(root);
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !self.sandbox.root.is_absolute() {
            return Err(DispatchError::Config(format!(
                "sandbox.root ({}) must be an absolute path",
                self.sandbox.root.display()
            )));
        }

        if self.synthesis.interpreter.is_empty() || self.synthesis.installer.is_empty() {
            return Err(DispatchError::Config(
                "synthesis.interpreter and synthesis.installer must name a program".into(),
            ));
        }

        if self.tools.retrieve_runner.is_empty() || self.tools.formatter.is_empty() {
            return Err(DispatchError::Config(
                "tools.retrieve_runner and tools.formatter must name a program".into(),
            ));
        }

        if self.llm.timeout_secs == 0
            || self.synthesis.install_timeout_secs == 0
            || self.synthesis.run_timeout_secs == 0
            || self.tools.timeout_secs == 0
        {
            return Err(DispatchError::Config("Timeouts must be positive".into()));
        }

        Ok(())
    }
}
