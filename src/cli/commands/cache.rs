//! Cache command - inspect and maintain the image cache

use crate::cache::{CacheEntry, CacheStore};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::TracMathResult;
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> TracMathResult<()> {
    let store = CacheStore::new(config.render.cache_dir.clone(), config.render.max_png);
    store.ensure_dir().await?;

    match args.action {
        CacheAction::List { format } => list_entries(&store, format).await,
        CacheAction::Prune => prune(&store).await,
        CacheAction::Clear { yes } => clear(&store, yes).await,
    }
}

/// List cached images
async fn list_entries(store: &CacheStore, format: OutputFormat) -> TracMathResult<()> {
    let entries = store.entries().await?;

    match format {
        OutputFormat::Table => print_entry_table(store, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.name);
            }
        }
    }

    Ok(())
}

fn print_entry_table(store: &CacheStore, entries: &[CacheEntry]) {
    if entries.is_empty() {
        println!("No cached images in {}", store.dir().display());
        return;
    }

    println!("{:<70} {:>10} {:<20}", "IMAGE", "BYTES", "LAST USED");
    println!("{}", "-".repeat(102));

    for entry in entries {
        println!(
            "{:<70} {:>10} {:<20}",
            entry.name,
            entry.size,
            entry.modified.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!();
    println!(
        "Total: {} of {} image(s)",
        entries.len(),
        store.max_entries()
    );
}

/// Run one maintenance cycle
async fn prune(store: &CacheStore) -> TracMathResult<()> {
    let report = store.populate().await?;

    for name in &report.evicted {
        println!("  {} {}", style("•").red(), name);
    }
    println!(
        "{} removed {} intermediate file(s), evicted {} image(s), {} remaining",
        style("✓").green(),
        report.garbage_removed,
        report.evicted.len(),
        report.remaining
    );

    Ok(())
}

/// Delete every cached image
async fn clear(store: &CacheStore, skip_confirm: bool) -> TracMathResult<()> {
    let entries = store.entries().await?;

    if entries.is_empty() {
        println!("No cached images to clear.");
        return Ok(());
    }

    println!(
        "This will remove {} cached image(s) from {}",
        entries.len(),
        store.dir().display()
    );

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = store.clear().await?;
    println!("{} cleared {} file(s)", style("✓").green(), removed);

    Ok(())
}
