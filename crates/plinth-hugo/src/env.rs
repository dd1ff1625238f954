//! Deployment environment snapshot.

use std::env;

/// Environment variables consulted by the orchestrator, captured once at
/// startup. Tasks receive this snapshot instead of reading globals, so a
/// single run always sees one consistent view.
#[derive(Debug, Clone, Default)]
pub struct DeployEnv {
    /// Hosting-platform deploy context ("production", "deploy-preview",
    /// "branch-deploy", ...). Unset outside CI.
    pub context: Option<String>,

    /// Canonical production URL.
    pub url: Option<String>,

    /// URL of the deploy currently being built (previews, branch deploys).
    pub deploy_prime_url: Option<String>,

    /// Pass `--debug` to hugo.
    pub debug: bool,

    /// Set when CI installs hugo on PATH; otherwise the vendored binary
    /// under `bin/` is used.
    pub hugo_version: Option<String>,
}

impl DeployEnv {
    /// Snapshot the process environment. Empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            context: non_empty(env::var("CONTEXT").ok()),
            url: non_empty(env::var("URL").ok()),
            deploy_prime_url: non_empty(env::var("DEPLOY_PRIME_URL").ok()),
            debug: env::var("DEBUG").is_ok_and(|v| !v.is_empty()),
            hugo_version: non_empty(env::var("HUGO_VERSION").ok()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
