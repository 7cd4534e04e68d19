//! Fetch command - copy a cached image out of the cache

use crate::cache::CacheStore;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{TracMathError, TracMathResult};
use crate::fetch;
use crate::render::ROUTE_PREFIX;
use tokio::io::AsyncWriteExt;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> TracMathResult<()> {
    let store = CacheStore::new(config.render.cache_dir.clone(), config.render.max_png);

    let image = if args.name.starts_with(ROUTE_PREFIX) {
        fetch::fetch(&store, &args.name).await?
    } else {
        fetch::fetch_name(&store, &args.name).await?
    };

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &image.bytes)
                .await
                .map_err(|e| TracMathError::io(format!("writing {}", path.display()), e))?;
            eprintln!("{} ({}, {} bytes)", path.display(), image.content_type, image.bytes.len());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&image.bytes)
                .await
                .map_err(|e| TracMathError::io("writing stdout", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| TracMathError::io("writing stdout", e))?;
        }
    }

    Ok(())
}
