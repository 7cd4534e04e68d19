//! Serve command - run the HTTP image server

use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::error::TracMathResult;
use crate::render::Renderer;
use crate::server;
use std::sync::Arc;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> TracMathResult<()> {
    let renderer = Renderer::new(config.render.clone()).with_base_url(&config.server.base_url);
    renderer.store().ensure_dir().await?;

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    server::serve(Arc::new(renderer), &bind).await
}
