//! Configuration file (plinth.toml) loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use plinth_hugo::{BaseUrlPolicy, SitePaths};
use plinth_server::ReloadStrategy;
use serde::Deserialize;

/// Configuration file structure (plinth.toml). A missing file means all
/// defaults, which match the conventional site layout.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub urls: UrlsConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Hugo content/source directory (`-s`).
    #[serde(default = "default_site")]
    pub site: String,

    /// Output directory shared by all tasks (`-d`).
    #[serde(default = "default_output")]
    pub output: String,

    /// Directory holding the top-level stylesheets.
    #[serde(default = "default_css")]
    pub css: String,

    /// Script bundle entry module.
    #[serde(default = "default_js_entry")]
    pub js_entry: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UrlsConfig {
    /// How the generator's base URL is chosen.
    #[serde(default)]
    pub policy: BaseUrlPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub open: bool,

    /// How completed rebuilds are pushed to connected browsers.
    #[serde(default = "default_reload")]
    pub reload: ReloadStrategy,
}

fn default_site() -> String {
    "site".to_string()
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_css() -> String {
    "src/css".to_string()
}
fn default_js_entry() -> String {
    "src/js/app.js".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_reload() -> ReloadStrategy {
    ReloadStrategy::Inject
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            output: default_output(),
            css: default_css(),
            js_entry: default_js_entry(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: false,
            reload: default_reload(),
        }
    }
}

impl Config {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(config);
        }
        Ok(Config::default())
    }

    pub fn output(&self) -> PathBuf {
        PathBuf::from(&self.paths.output)
    }

    pub fn site_paths(&self) -> SitePaths {
        SitePaths {
            output: self.output(),
            site: PathBuf::from(&self.paths.site),
        }
    }

    pub fn css_source(&self) -> PathBuf {
        PathBuf::from(&self.paths.css)
    }

    /// Stylesheets land under `css/` inside the output directory.
    pub fn css_output(&self) -> PathBuf {
        self.output().join("css")
    }

    pub fn js_entry(&self) -> PathBuf {
        PathBuf::from(&self.paths.js_entry)
    }

    /// Directory watched for script changes.
    pub fn js_source(&self) -> PathBuf {
        self.js_entry()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("src/js"))
    }

    /// The bundle keeps the entry module's file name.
    pub fn js_output(&self) -> PathBuf {
        let name = self
            .js_entry()
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("app.js"));
        self.output().join(name)
    }
}
