//! Watch server: initial development build, static serving with live
//! reload, and the rebuild-on-change loop.

use anyhow::{Context, Result};
use plinth_assets::{css, js, BundleOptions, CssConfig};
use plinth_hugo::{hugo_args, hugo_binary, run_hugo, BuildMode, DeployEnv, HugoError};
use plinth_server::{
    DevServer, DevServerConfig, FileWatcher, ReloadHub, ReloadMessage, ReloadStrategy, WatchEvent,
    WatchRoots,
};

use crate::config::Config;

/// Run the watch server until externally terminated.
pub async fn run(config: &Config, port: Option<u16>, open: bool) -> Result<()> {
    let env = DeployEnv::from_env();
    let hub = ReloadHub::new();

    let server = DevServer::new(
        DevServerConfig {
            root: config.output(),
            host: config.dev.host.clone(),
            port: port.unwrap_or(config.dev.port),
            open: open || config.dev.open,
        },
        hub.clone(),
    );

    // Bind before building so every hugo invocation resolves its loopback
    // base URL against the port that was actually obtained.
    let bound = server.bind().await?;
    let bound_port = bound.addr().port();

    let css_config = CssConfig {
        source_dir: config.css_source(),
        out_dir: config.css_output(),
    };
    let bundle = BundleOptions {
        entry: config.js_entry(),
        out_file: config.js_output(),
        minify: false,
    };

    // Initial build: generator and both asset pipelines in parallel.
    {
        let css_config = css_config.clone();
        let bundle = bundle.clone();
        let css_task = tokio::task::spawn_blocking(move || css::process_css(&css_config));
        let js_task = tokio::task::spawn_blocking(move || js::bundle_js(&bundle));

        tokio::try_join!(
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
            async {
                run_site(config, &env, bound_port)
                    .await
                    .map_err(anyhow::Error::from)
            },
        )?;
    }

    let (watcher, mut rx) = FileWatcher::new(&WatchRoots {
        css_dir: config.css_source(),
        js_dir: config.js_source(),
        site_dir: config.site_paths().site,
    })?;

    let ctx = RebuildContext {
        config: config.clone(),
        env,
        port: bound_port,
        strategy: config.dev.reload,
        hub,
        css: css_config,
        bundle,
    };

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            ctx.handle(event).await;
        }
        // Keep watcher alive
        drop(watcher);
    });

    bound.serve().await?;
    Ok(())
}

/// One development-mode generator run.
async fn run_site(config: &Config, env: &DeployEnv, port: u16) -> Result<(), HugoError> {
    let args = hugo_args(
        &config.site_paths(),
        BuildMode::Development,
        env,
        config.urls.policy,
        Some(port),
    );
    run_hugo(&hugo_binary(env), &args).await
}

/// Everything the rebuild loop needs, captured once.
struct RebuildContext {
    config: Config,
    env: DeployEnv,
    port: u16,
    strategy: ReloadStrategy,
    hub: ReloadHub,
    css: CssConfig,
    bundle: BundleOptions,
}

impl RebuildContext {
    async fn handle(&self, event: WatchEvent) {
        match event {
            WatchEvent::Stylesheet(path) => {
                tracing::info!("Stylesheet changed: {}", path.display());

                let css_config = self.css.clone();
                match tokio::task::spawn_blocking(move || css::process_css(&css_config)).await {
                    Ok(Ok(written)) => {
                        let paths = written
                            .iter()
                            .filter_map(|p| p.file_name())
                            .map(|name| format!("css/{}", name.to_string_lossy()))
                            .collect();
                        if let Some(msg) = self.strategy.css_message(paths) {
                            self.hub.send(msg);
                        }
                    }
                    Ok(Err(e)) => tracing::error!("Stylesheet rebuild failed: {}", e),
                    Err(e) => tracing::error!("Stylesheet task panicked: {}", e),
                }
            }

            WatchEvent::Script(path) => {
                tracing::info!("Script changed: {}", path.display());

                let bundle = self.bundle.clone();
                match tokio::task::spawn_blocking(move || js::bundle_js(&bundle)).await {
                    Ok(Ok(_)) => {
                        if let Some(msg) = self.strategy.reload_message() {
                            self.hub.send(msg);
                        }
                    }
                    Ok(Err(e)) => tracing::error!("Script rebuild failed: {}", e),
                    Err(e) => tracing::error!("Script task panicked: {}", e),
                }
            }

            WatchEvent::Content(path) => {
                tracing::info!("Content changed: {}", path.display());

                match run_site(&self.config, &self.env, self.port).await {
                    Ok(()) => {
                        if let Some(msg) = self.strategy.reload_message() {
                            self.hub.send(msg);
                        }
                    }
                    Err(e) => {
                        tracing::error!("{}", e);
                        self.hub.send(ReloadMessage::Notify {
                            message: "Hugo build failed".to_string(),
                        });
                    }
                }
            }
        }
    }
}
