//! Stylesheet pipeline.
//!
//! Every top-level `*.css` file in the source directory is treated as an
//! entry: its `@import`s are inlined (resolved relative to the importing
//! file), modern syntax is lowered to the browser matrix below, and the
//! minified result lands in the output directory under the same name.

use std::fs;
use std::path::{Path, PathBuf};

use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::ParserOptions;
use lightningcss::targets::{Browsers, Targets};

/// Configuration for one stylesheet pipeline run.
#[derive(Debug, Clone)]
pub struct CssConfig {
    /// Directory holding the top-level stylesheets.
    pub source_dir: PathBuf,

    /// Directory the processed stylesheets are written to.
    pub out_dir: PathBuf,
}

/// Errors from the stylesheet pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("Failed to read {0}: {1}")]
    Read(String, String),

    #[error("Failed to bundle {0}: {1}")]
    Bundle(String, String),

    #[error("Failed to print {0}: {1}")]
    Print(String, String),

    #[error("Failed to write {0}: {1}")]
    Write(String, String),
}

// Versions are encoded major << 16 | minor << 8.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(90 << 16),
        edge: Some(90 << 16),
        firefox: Some(88 << 16),
        safari: Some(14 << 16),
        ios_saf: Some(14 << 16),
        ..Browsers::default()
    })
}

/// Process every top-level stylesheet in `source_dir`.
///
/// Returns the written output paths so the watch server can push an
/// incremental style update for exactly those files.
pub fn process_css(config: &CssConfig) -> Result<Vec<PathBuf>, CssError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(&config.source_dir)
        .map_err(|e| CssError::Read(config.source_dir.display().to_string(), e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("css")
        })
        .collect();
    entries.sort();

    fs::create_dir_all(&config.out_dir)
        .map_err(|e| CssError::Write(config.out_dir.display().to_string(), e.to_string()))?;

    let mut written = Vec::with_capacity(entries.len());

    for entry in &entries {
        let code = bundle_stylesheet(entry)?;

        let file_name = entry
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("main.css"));
        let out_path = config.out_dir.join(file_name);

        fs::write(&out_path, code)
            .map_err(|e| CssError::Write(out_path.display().to_string(), e.to_string()))?;
        written.push(out_path);
    }

    tracing::info!(
        "Processed {} stylesheet(s) into {}",
        written.len(),
        config.out_dir.display()
    );

    Ok(written)
}

/// Inline imports, lower to the target matrix, and minify one stylesheet.
fn bundle_stylesheet(entry: &Path) -> Result<String, CssError> {
    let provider = FileProvider::new();
    let mut bundler = Bundler::new(&provider, None, ParserOptions::default());

    let stylesheet = bundler
        .bundle(entry)
        .map_err(|e| CssError::Bundle(entry.display().to_string(), e.to_string()))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| CssError::Print(entry.display().to_string(), e.to_string()))?;

    Ok(output.code)
}
