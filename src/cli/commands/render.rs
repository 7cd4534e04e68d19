//! Render command - render a formula or wiki markup from a file or stdin

use crate::cli::args::RenderArgs;
use crate::config::Config;
use crate::error::{TracMathError, TracMathResult};
use crate::markup;
use crate::render::Renderer;
use tokio::io::AsyncReadExt;

/// Execute the render command
pub async fn execute(args: RenderArgs, config: &Config) -> TracMathResult<()> {
    let input = read_input(&args).await?;
    let base_url = args
        .base_url
        .unwrap_or_else(|| config.server.base_url.clone());
    let renderer = Renderer::new(config.render.clone()).with_base_url(base_url);

    if args.markup {
        println!("{}", markup::expand(&input, &renderer).await);
        return Ok(());
    }

    match renderer.render(&args.r#macro, &input).await {
        Ok(image) => {
            println!("{}", renderer.image_html(&image));
            Ok(())
        }
        Err(e) => {
            println!("{}", renderer.error_html(&e));
            Err(e)
        }
    }
}

async fn read_input(args: &RenderArgs) -> TracMathResult<String> {
    match &args.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TracMathError::io(format!("reading {}", path.display()), e)),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|e| TracMathError::io("reading stdin", e))?;
            Ok(buf)
        }
    }
}
