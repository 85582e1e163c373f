//! Package policy for synthesized scripts
//!
//! Every declared package is checked before the first install runs, so a
//! rejected package never leaves a half-installed set behind.

use crate::core::config::SynthesisConfig;
use crate::core::error::{DispatchError, Result};
use ahash::AHashSet;
use regex::Regex;
use tracing::warn;

/// Name, optional extras, optional comma-separated version clauses
const REQUIREMENT_PATTERN: &str =
    r"^[A-Za-z0-9][A-Za-z0-9._-]*(\[[\w,.-]+\])?([<>=!~]=?[\w.*+!-]+(,[<>=!~]=?[\w.*+!-]+)*)?$";

/// Outcome of checking one package against the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageDecision {
    Install { spec: String },
    Blocked { package: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct PackagePolicy {
    blocked: AHashSet<String>,
    /// Empty means any package not blocked may be installed
    allowed: AHashSet<String>,
}

impl PackagePolicy {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            blocked: config.blocked_packages.iter().map(|p| package_name(p)).collect(),
            allowed: config.allowed_packages.iter().map(|p| package_name(p)).collect(),
        }
    }

    pub fn decide(&self, spec: &str) -> PackageDecision {
        let spec = spec.trim();
        if !is_plain_requirement(spec) {
            return PackageDecision::Blocked {
                package: spec.to_string(),
                reason: "only index package names with optional extras and versions are installed"
                    .into(),
            };
        }
        let name = package_name(spec);
        if self.blocked.contains(&name) {
            return PackageDecision::Blocked {
                package: name,
                reason: "package is in the blocked list".into(),
            };
        }
        if !self.allowed.is_empty() && !self.allowed.contains(&name) {
            return PackageDecision::Blocked {
                package: name,
                reason: "package is not in the allowed list".into(),
            };
        }
        PackageDecision::Install {
            spec: spec.to_string(),
        }
    }

    /// De-duplicate by bare name, keeping first-seen order, and check all.
    ///
    /// Returns the specs to install, or the first rejection.
    pub fn plan(&self, specs: &[String]) -> Result<Vec<String>> {
        let mut seen = AHashSet::new();
        let mut plan = Vec::new();
        for spec in specs {
            match self.decide(spec) {
                PackageDecision::Install { spec } => {
                    if seen.insert(package_name(&spec)) {
                        plan.push(spec);
                    }
                }
                PackageDecision::Blocked { package, reason } => {
                    warn!(%package, %reason, "dependency rejected");
                    return Err(DispatchError::DependencyInstallFailed {
                        dependency: package,
                        stderr: reason,
                    });
                }
            }
        }
        Ok(plan)
    }
}

/// Rejects flags, URLs, VCS references and local paths
fn is_plain_requirement(spec: &str) -> bool {
    Regex::new(REQUIREMENT_PATTERN)
        .map(|re| re.is_match(spec))
        .unwrap_or(false)
}

/// Bare lowercase name of a package spec: `pandas>=2.0` is `pandas`
pub fn package_name(spec: &str) -> String {
    spec.split(|c| matches!(c, '=' | '<' | '>' | '!' | '~' | '[' | ';' | '@' | ' '))
        .next()
        .unwrap_or(spec)
        .trim()
        .to_lowercase()
        .replace('_', "-")
}
