//! The import run.
//!
//! Reads the cached feed (or fetches and caches it), runs the pipeline,
//! writes the result artifacts and, when asked, exports accepted events.

use std::fs;
use std::path::{Path, PathBuf};

use calimport_feed::{ExportClient, FeedClient, ImportOutcome, process_feed};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::RunArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Accepted events, as `{"events": [...]}`.
pub const EVENTS_FILE: &str = "events.json";
/// Components whose properties could not be read.
pub const BROKEN_FILE: &str = "broken.json";
/// Records that failed validation.
pub const UNPARSED_FILE: &str = "unparsed.json";

/// Runs the import.
pub async fn run(args: RunArgs, config: &ClientConfig) -> ClientResult<()> {
    let ics = if args.fetch {
        fetch_feed(config).await?
    } else {
        read_cache(&config.cache_path())?
    };

    let outcome = import(&ics, &args, config)?;

    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.output_dir());
    write_artifacts(&outcome, &output_dir)?;

    let exported = if args.export {
        Some(export(&outcome, config).await?)
    } else {
        None
    };

    println!("{}", summary(&outcome, exported));
    Ok(())
}

/// Downloads the feed and refreshes the cache.
async fn fetch_feed(config: &ClientConfig) -> ClientResult<String> {
    let feed_config = config.feed.to_feed_config().map_err(ClientError::Config)?;
    let client = FeedClient::new(feed_config)?;
    let ics = client.fetch().await?;

    let cache_path = config.cache_path();
    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent).map_err(|e| ClientError::io(parent, e))?;
    }
    fs::write(&cache_path, &ics).map_err(|e| ClientError::io(&cache_path, e))?;
    debug!(path = %cache_path.display(), "Refreshed feed cache");

    Ok(ics)
}

/// Reads the cached feed.
fn read_cache(path: &Path) -> ClientResult<String> {
    fs::read_to_string(path).map_err(|e| ClientError::io(path, e))
}

/// Runs the configured pipeline over the feed text.
pub fn import(ics: &str, args: &RunArgs, config: &ClientConfig) -> ClientResult<ImportOutcome> {
    let pipeline = config.pipeline().map_err(ClientError::Config)?;
    let cutoff = args.cutoff.or(config.import.cutoff);

    process_feed(ics, &pipeline, cutoff)
        .ok_or_else(|| ClientError::Aborted("feed is not a valid iCalendar document".to_string()))
}

/// Writes the three artifacts into `dir` and returns their paths.
pub fn write_artifacts(outcome: &ImportOutcome, dir: &Path) -> ClientResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| ClientError::io(dir, e))?;

    let paths = vec![
        write_json(&dir.join(EVENTS_FILE), "events", &outcome.export_payload())?,
        write_json(&dir.join(BROKEN_FILE), "broken records", &outcome.broken)?,
        write_json(&dir.join(UNPARSED_FILE), "unparsed records", &outcome.unparsed)?,
    ];

    info!(dir = %dir.display(), "Wrote import artifacts");
    Ok(paths)
}

fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    value: &T,
) -> ClientResult<PathBuf> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|source| ClientError::Serialize { what, source })?;
    fs::write(path, json + "\n").map_err(|e| ClientError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// Sends accepted events to the export endpoint and returns the created count.
async fn export(outcome: &ImportOutcome, config: &ClientConfig) -> ClientResult<usize> {
    if outcome.accepted.is_empty() {
        info!("Nothing to export");
        return Ok(0);
    }

    let export_config = config
        .export
        .to_export_config()
        .map_err(ClientError::Config)?;
    let client = ExportClient::new(export_config)?;
    Ok(client.create_events(&outcome.accepted, &Local).await?)
}

/// One-line run summary for stdout.
pub fn summary(outcome: &ImportOutcome, exported: Option<usize>) -> String {
    let mut line = format!(
        "{} accepted ({} without end date), {} broken, {} unparsed, {} after cutoff",
        outcome.accepted.len(),
        outcome.no_end_count,
        outcome.broken.len(),
        outcome.unparsed.len(),
        outcome.filtered_count,
    );
    if let Some(count) = exported {
        line.push_str(&format!(", {} exported", count));
    }
    line
}
