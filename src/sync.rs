use std::path::PathBuf;

use color_eyre::eyre::WrapErr;

use crate::backend::{Backend, BackendError};
use crate::export::{ExportError, ExportTarget, export_playlist};
use crate::model::{PlaylistIdentity, SyncReport, Track, TrackResult};

/// How a synchronization run ended.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Tracks were pushed to the host app.
    Synced(SyncReport),
    /// No live backend; the playlist was written to a file instead.
    Exported { path: PathBuf, total: usize },
    /// Playlist creation failed; the file export is the recovery. The run
    /// still counts as failed.
    Recovered {
        path: PathBuf,
        total: usize,
        error: BackendError,
    },
}

impl SyncOutcome {
    /// The process result for this run. A recovery export still fails the run.
    pub fn into_result(self) -> color_eyre::Result<()> {
        match self {
            SyncOutcome::Synced(_) | SyncOutcome::Exported { .. } => Ok(()),
            SyncOutcome::Recovered { path, error, .. } => {
                Err(color_eyre::Report::new(error).wrap_err(format!(
                    "Playlist creation failed; the songs were exported to {}",
                    path.display()
                )))
            }
        }
    }
}

/// Synchronizes `tracks` into the playlist `playlist`.
///
/// Tracks are processed strictly in order with one host call at a time.
/// Per-track failures land in the report and never stop the run. Only an
/// export failure is returned as an error.
pub async fn sync_playlist(
    tracks: &[Track],
    playlist: &PlaylistIdentity,
    backend: &mut Backend,
    export_target: &ExportTarget,
) -> Result<SyncOutcome, ExportError> {
    if backend.is_null() {
        let path = export_playlist(tracks, &playlist.name, export_target)?;
        return Ok(SyncOutcome::Exported {
            path,
            total: tracks.len(),
        });
    }

    log::info!(
        "Syncing {} tracks to '{}' via {}",
        tracks.len(),
        playlist.name,
        backend.name()
    );

    if let Err(error) = backend.ensure_playlist(&playlist.name).await {
        log::error!(
            "Failed to create playlist '{}': {}; exporting instead",
            playlist.name,
            error
        );
        let path = export_playlist(tracks, &playlist.name, export_target)?;
        return Ok(SyncOutcome::Recovered {
            path,
            total: tracks.len(),
            error,
        });
    }

    let mut results = Vec::with_capacity(tracks.len());
    for (position, track) in tracks.iter().enumerate() {
        let outcome = backend.search_and_add_track(&playlist.name, track).await;
        log::info!(
            "[{}/{}] {}: {:?}",
            position + 1,
            tracks.len(),
            track,
            outcome
        );
        results.push(TrackResult {
            track: track.clone(),
            outcome,
        });
    }

    let report = SyncReport::new(playlist.name.clone(), results);
    log::info!(
        "Sync complete for '{}': {} added, {} not found or failed",
        report.playlist_name,
        report.added(),
        report.not_found_or_failed()
    );

    Ok(SyncOutcome::Synced(report))
}
