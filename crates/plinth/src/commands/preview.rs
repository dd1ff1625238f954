//! Preview build: the production pipeline with drafts and future-dated
//! content included.

use anyhow::Result;
use plinth_hugo::BuildMode;

use crate::commands::build;
use crate::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    build::run(config, BuildMode::Preview).await
}
