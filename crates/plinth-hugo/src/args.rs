//! Argument construction for hugo invocations.
//!
//! The argument list is built fresh for every invocation from the
//! [`DeployEnv`] snapshot and the caller's mode, so the base-URL pair can
//! never be duplicated and the dev server can re-resolve with the port it
//! actually bound.

use std::path::PathBuf;

use serde::Deserialize;

use crate::env::DeployEnv;

/// Directories hugo reads from and writes to.
#[derive(Debug, Clone)]
pub struct SitePaths {
    /// Output directory (`-d`).
    pub output: PathBuf,

    /// Content/source directory (`-s`).
    pub site: PathBuf,
}

impl Default for SitePaths {
    fn default() -> Self {
        Self {
            output: PathBuf::from("dist"),
            site: PathBuf::from("site"),
        }
    }
}

/// Which pipeline the site is being generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Published content only.
    Production,

    /// Include drafts and future-dated content.
    Preview,

    /// Hugo's `development` environment, used by the watch server.
    Development,
}

impl BuildMode {
    fn flags(self) -> &'static [&'static str] {
        match self {
            BuildMode::Production => &[],
            BuildMode::Preview => &["--buildDrafts", "--buildFuture"],
            BuildMode::Development => &["-e", "development"],
        }
    }
}

/// How the `-b <base-url>` argument is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseUrlPolicy {
    /// Map the hosting platform's deploy context to a URL, falling back to
    /// a loopback URL (with the dev server's bound port) outside CI.
    DeployContext,

    /// Use the preview deploy URL when present, otherwise omit `-b`
    /// entirely and let the site config decide.
    PreviewEnv,
}

impl Default for BaseUrlPolicy {
    fn default() -> Self {
        BaseUrlPolicy::DeployContext
    }
}

/// Resolve the base URL for one invocation. `port` is the dev server's
/// bound port, when one is serving.
pub fn resolve_base_url(
    policy: BaseUrlPolicy,
    env: &DeployEnv,
    port: Option<u16>,
) -> Option<String> {
    match policy {
        BaseUrlPolicy::DeployContext => {
            let url = match env.context.as_deref() {
                Some("production") => env.url.clone(),
                // deploy-preview, branch-deploy, and anything else the
                // platform invents all build against the deploy's own URL.
                Some(_) => env.deploy_prime_url.clone(),
                None => None,
            };
            url.or_else(|| Some(format!("http://localhost:{}", port.unwrap_or(3000))))
        }
        BaseUrlPolicy::PreviewEnv => env.deploy_prime_url.clone(),
    }
}

/// Build the full argument list for one hugo invocation.
pub fn hugo_args(
    paths: &SitePaths,
    mode: BuildMode,
    env: &DeployEnv,
    policy: BaseUrlPolicy,
    port: Option<u16>,
) -> Vec<String> {
    let mut args = Vec::new();

    if env.debug {
        args.push("--debug".to_string());
    }

    args.push("-d".to_string());
    args.push(paths.output.display().to_string());
    args.push("-s".to_string());
    args.push(paths.site.display().to_string());

    if let Some(url) = resolve_base_url(policy, env, port) {
        args.push("-b".to_string());
        args.push(url);
    }

    args.extend(mode.flags().iter().map(|f| f.to_string()));

    args
}

/// Pick the hugo executable: the PATH-installed one when CI pins a version,
/// otherwise the platform-specific vendored binary.
pub fn hugo_binary(env: &DeployEnv) -> PathBuf {
    if env.hugo_version.is_some() {
        return PathBuf::from("hugo");
    }

    if cfg!(windows) {
        PathBuf::from("bin/hugo.exe")
    } else {
        PathBuf::from(format!("bin/hugo.{}", vendored_os(std::env::consts::OS)))
    }
}

/// Vendored binaries follow node's platform naming, where macOS is
/// `darwin`.
fn vendored_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn netlify_env(context: &str) -> DeployEnv {
        DeployEnv {
            context: Some(context.to_string()),
            url: Some("https://example.com".to_string()),
            deploy_prime_url: Some("https://deploy--x.netlify.app".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn production_context_uses_production_url() {
        let url = resolve_base_url(BaseUrlPolicy::DeployContext, &netlify_env("production"), None);
        assert_eq!(url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn preview_contexts_use_deploy_prime_url() {
        for context in ["deploy-preview", "branch-deploy", "something-new"] {
            let url = resolve_base_url(BaseUrlPolicy::DeployContext, &netlify_env(context), None);
            assert_eq!(url.as_deref(), Some("https://deploy--x.netlify.app"));
        }
    }

    #[test]
    fn no_context_falls_back_to_loopback() {
        let env = DeployEnv::default();

        let url = resolve_base_url(BaseUrlPolicy::DeployContext, &env, None);
        assert_eq!(url.as_deref(), Some("http://localhost:3000"));

        let url = resolve_base_url(BaseUrlPolicy::DeployContext, &env, Some(41234));
        assert_eq!(url.as_deref(), Some("http://localhost:41234"));
    }

    #[test]
    fn missing_production_url_falls_back_to_loopback() {
        let env = DeployEnv {
            context: Some("production".to_string()),
            ..Default::default()
        };

        let url = resolve_base_url(BaseUrlPolicy::DeployContext, &env, None);
        assert_eq!(url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn preview_env_policy_omits_base_url_when_unset() {
        let url = resolve_base_url(BaseUrlPolicy::PreviewEnv, &DeployEnv::default(), Some(3000));
        assert_eq!(url, None);

        let env = DeployEnv {
            deploy_prime_url: Some("https://deploy--x.netlify.app".to_string()),
            ..Default::default()
        };
        let url = resolve_base_url(BaseUrlPolicy::PreviewEnv, &env, None);
        assert_eq!(url.as_deref(), Some("https://deploy--x.netlify.app"));
    }

    #[test]
    fn args_contain_at_most_one_base_url_pair() {
        let paths = SitePaths::default();
        let env = netlify_env("production");

        for _ in 0..3 {
            let args = hugo_args(
                &paths,
                BuildMode::Production,
                &env,
                BaseUrlPolicy::DeployContext,
                None,
            );
            assert_eq!(args.iter().filter(|a| *a == "-b").count(), 1);
        }

        let args = hugo_args(
            &paths,
            BuildMode::Production,
            &DeployEnv::default(),
            BaseUrlPolicy::PreviewEnv,
            None,
        );
        assert_eq!(args.iter().filter(|a| *a == "-b").count(), 0);
    }

    #[test]
    fn preview_mode_adds_draft_and_future_flags() {
        let paths = SitePaths::default();
        let env = DeployEnv::default();

        let preview = hugo_args(
            &paths,
            BuildMode::Preview,
            &env,
            BaseUrlPolicy::DeployContext,
            None,
        );
        assert!(preview.contains(&"--buildDrafts".to_string()));
        assert!(preview.contains(&"--buildFuture".to_string()));

        let build = hugo_args(
            &paths,
            BuildMode::Production,
            &env,
            BaseUrlPolicy::DeployContext,
            None,
        );
        assert!(!build.contains(&"--buildDrafts".to_string()));
        assert!(!build.contains(&"--buildFuture".to_string()));
    }

    #[test]
    fn development_mode_sets_environment() {
        let args = hugo_args(
            &SitePaths::default(),
            BuildMode::Development,
            &DeployEnv::default(),
            BaseUrlPolicy::DeployContext,
            Some(3000),
        );

        let pos = args.iter().position(|a| a == "-e").unwrap();
        assert_eq!(args[pos + 1], "development");
    }

    #[test]
    fn debug_flag_comes_first() {
        let env = DeployEnv {
            debug: true,
            ..Default::default()
        };

        let args = hugo_args(
            &SitePaths::default(),
            BuildMode::Production,
            &env,
            BaseUrlPolicy::DeployContext,
            None,
        );
        assert_eq!(args[0], "--debug");
    }

    #[test]
    fn directories_come_from_paths() {
        let paths = SitePaths {
            output: PathBuf::from("../dist"),
            site: PathBuf::from("site"),
        };

        let args = hugo_args(
            &paths,
            BuildMode::Production,
            &DeployEnv::default(),
            BaseUrlPolicy::DeployContext,
            None,
        );
        assert_eq!(&args[..4], ["-d", "../dist", "-s", "site"]);
    }

    #[test]
    fn binary_selection_honors_version_marker() {
        let pinned = DeployEnv {
            hugo_version: Some("0.139.0".to_string()),
            ..Default::default()
        };
        assert_eq!(hugo_binary(&pinned), PathBuf::from("hugo"));

        let vendored = hugo_binary(&DeployEnv::default());
        assert!(vendored.starts_with("bin"));
    }

    #[test]
    fn vendored_naming_uses_darwin_for_macos() {
        assert_eq!(vendored_os("macos"), "darwin");
        assert_eq!(vendored_os("linux"), "linux");
        assert_eq!(vendored_os("freebsd"), "freebsd");
    }
}
