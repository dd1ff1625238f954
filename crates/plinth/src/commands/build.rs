//! Static build: clean, then the generator and both asset pipelines in
//! parallel. Any failing leaf aborts the whole pipeline.

use anyhow::{Context, Result};
use plinth_assets::{css, js, BundleOptions, CssConfig};
use plinth_hugo::{hugo_args, hugo_binary, run_hugo, BuildMode, DeployEnv};

use crate::commands::clean;
use crate::config::Config;

/// Run a full build in the given mode.
pub async fn run(config: &Config, mode: BuildMode) -> Result<()> {
    let env = DeployEnv::from_env();

    // The output directory must be gone before any task writes into it.
    clean::run(&config.output()).await?;

    let css_config = CssConfig {
        source_dir: config.css_source(),
        out_dir: config.css_output(),
    };
    let bundle = BundleOptions {
        entry: config.js_entry(),
        out_file: config.js_output(),
        minify: true,
    };

    let hugo = async {
        let args = hugo_args(&config.site_paths(), mode, &env, config.urls.policy, None);
        run_hugo(&hugo_binary(&env), &args)
            .await
            .context("Hugo build failed")
    };

    let css_task = tokio::task::spawn_blocking(move || css::process_css(&css_config));
    let js_task = tokio::task::spawn_blocking(move || js::bundle_js(&bundle));

    let (stylesheets, bundle_out, ()) = tokio::try_join!(
        async {
            css_task
                .await
                .context("CSS task panicked")?
                .map_err(anyhow::Error::from)
        },
        async {
            js_task
                .await
                .context("JS task panicked")?
                .map_err(anyhow::Error::from)
        },
        hugo,
    )?;

    tracing::info!(
        "Build complete: {} stylesheet(s), {} script module(s) in {}",
        stylesheets.len(),
        bundle_out.modules,
        bundle_out.out_file.display()
    );

    Ok(())
}
