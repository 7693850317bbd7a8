use std::path::Path;

use crate::model::{AddOutcome, SyncReport, TrackResult};
use crate::sync::SyncOutcome;

const RULE: &str = "==================================================";

fn track_line(result: &TrackResult) -> String {
    let track = &result.track;
    match &result.outcome {
        AddOutcome::Added => format!("  ✓ Added: {}", track),
        AddOutcome::NotFound => format!("  ✗ Not found: {}", track),
        AddOutcome::Error(message) => format!("  ✗ Error adding {}: {}", track, message),
    }
}

fn banner(title: &str) -> [String; 3] {
    [RULE.to_string(), title.to_string(), RULE.to_string()]
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn render_sync_report(report: &SyncReport) -> String {
    let mut lines = vec!["Adding songs to playlist:".to_string()];
    lines.extend(report.tracks.iter().map(track_line));
    lines.push(String::new());
    lines.extend(banner("Playlist creation complete!"));
    lines.push(format!("Playlist name: {}", report.playlist_name));
    lines.push(format!("Total songs: {}", report.total()));
    lines.push(format!("Successfully added: {}", report.added()));
    lines.push(format!("Not found/failed: {}", report.not_found_or_failed()));
    finish(lines)
}

fn export_lines(playlist_name: &str, total: usize, path: &Path) -> Vec<String> {
    let mut lines = Vec::from(banner("Playlist exported"));
    lines.push(format!("Playlist name: {}", playlist_name));
    lines.push(format!("Total songs: {}", total));
    lines.push(format!("Exported to: {}", path.display()));
    lines.push(
        "Each entry names a song to look up; import the file or search for them in your player."
            .to_string(),
    );
    lines
}

/// Renders whatever the run produced: the live summary, or the export
/// location when the run fell back to a file.
pub fn render_outcome(playlist_name: &str, outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Synced(report) => render_sync_report(report),
        SyncOutcome::Exported { path, total } => {
            finish(export_lines(playlist_name, *total, path))
        }
        SyncOutcome::Recovered { path, total, error } => {
            let mut lines = vec![
                format!("Error creating playlist: {}", error),
                format!("No songs were added to the music app (0 of {}).", total),
            ];
            lines.extend(export_lines(playlist_name, *total, path));
            finish(lines)
        }
    }
}
