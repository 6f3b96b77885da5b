//! Background tasks for the Visage server.
//!
//! Includes:
//! - Sweeping audio artifacts that were synthesized but never fetched.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;

/// Starts the artifact sweep task.
///
/// This task runs indefinitely, periodically removing artifacts older than
/// `max_age_seconds` from `audio_dir`. Delivered artifacts are already gone
/// by then; the sweep reclaims only the ones no caller ever fetched or that
/// were abandoned mid-download.
pub async fn start_sweep_task(audio_dir: PathBuf, max_age_seconds: u64) {
    if max_age_seconds == 0 {
        tracing::warn!("artifact sweep disabled (max_age=0)");
        return;
    }

    // Run every 60 seconds or max_age/2, whichever is smaller (but min 1s)
    let interval_seconds = (max_age_seconds / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_seconds);

    tracing::info!(
        max_age_seconds,
        interval_seconds,
        dir = %audio_dir.display(),
        "starting artifact sweep task"
    );

    loop {
        sleep(interval).await;

        match sweep_once(&audio_dir, Duration::from_secs(max_age_seconds)).await {
            Ok(0) => {}
            Ok(count) => {
                tracing::info!(count, "swept expired audio artifacts");
            }
            Err(e) => {
                tracing::error!("artifact sweep failed: {}", e);
            }
        }
    }
}

/// Removes artifacts older than `max_age` from `audio_dir`.
///
/// Only files matching the artifact naming pattern are considered; anything
/// else in the directory is left alone. Returns the number of files removed.
pub async fn sweep_once(audio_dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(audio_dir).await {
        Ok(entries) => entries,
        // Nothing synthesized yet; the chat handler creates the directory.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with("response_") || !name.ends_with(".mp3") {
            continue;
        }

        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let Ok(age) = modified.elapsed() else {
            continue;
        };
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            // Delivery may have removed it between listing and now.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %entry.path().display(),
                    "failed to sweep audio artifact"
                );
            }
        }
    }

    Ok(removed)
}
