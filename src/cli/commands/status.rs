//! Status command - check binaries and cache directory

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::TracMathResult;
use console::{style, Emoji};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");

/// Execute the status command
pub async fn execute(config: &Config) -> TracMathResult<()> {
    println!("{}", style("TracMath Status").bold().cyan());
    println!();

    let mut all_ok = true;

    println!("{}", style("Toolchain:").bold());
    all_ok &= check_binary("latex", &config.render.latex_cmd, "--version").await;
    all_ok &= check_binary("dvipng", &config.render.dvipng_cmd, "--version").await;

    println!();
    println!("{}", style("Cache:").bold());
    all_ok &= check_cache(config).await;

    println!();
    if all_ok {
        println!("{}", style("All checks passed").green().bold());
    } else {
        println!(
            "{}",
            style("Some checks failed - see above for details").yellow().bold()
        );
    }

    Ok(())
}

async fn check_binary(name: &str, path: &Path, version_flag: &str) -> bool {
    let output = Command::new(path)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            let version = stdout.lines().next().unwrap_or("").trim();
            println!("  {} {}: {}", CHECK, name, version);
            true
        }
        _ => {
            println!(
                "  {} {} - not runnable at {}",
                CROSS,
                style(name).red(),
                path.display()
            );
            false
        }
    }
}

async fn check_cache(config: &Config) -> bool {
    let store = CacheStore::new(config.render.cache_dir.clone(), config.render.max_png);

    if let Err(e) = store.ensure_dir().await {
        println!("  {} {}", CROSS, style(e).red());
        return false;
    }

    match store.entries().await {
        Ok(entries) => {
            println!("  {} Directory: {}", CHECK, store.dir().display());
            println!(
                "  {} Images: {} / {}",
                CHECK,
                entries.len(),
                store.max_entries()
            );
            true
        }
        Err(e) => {
            println!("  {} {}", CROSS, style(e).red());
            false
        }
    }
}
