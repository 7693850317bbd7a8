use std::path::{Path, PathBuf};

use crate::model::Track;

pub const PLAYLIST_EXTENSION: &str = "m3u";

const HEADER: &str = "#EXTM3U";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write playlist file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where an export should be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTarget {
    /// Exact file to write; wins over everything else
    pub path: Option<PathBuf>,
    /// Directory for a file name derived from the playlist name
    pub directory: Option<PathBuf>,
}

impl ExportTarget {
    pub fn resolve(&self, playlist_name: &str) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        let file_name = playlist_file_name(playlist_name);
        match &self.directory {
            Some(directory) => directory.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Keeps letters, digits, spaces, hyphens and underscores, drops everything
/// else, trims trailing whitespace and appends the playlist extension.
pub fn playlist_file_name(playlist_name: &str) -> String {
    let stem: String = playlist_name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = stem.trim_end();
    let stem = if stem.is_empty() { "playlist" } else { stem };
    format!("{}.{}", stem, PLAYLIST_EXTENSION)
}

/// Renders the M3U reference list: a header, then an `#EXTINF` entry with
/// unknown duration and the search phrase for every track.
///
/// No entry carries a playable location, so players show it as a list of
/// tracks to look up rather than something they can play directly.
pub fn render_m3u(tracks: &[Track]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + tracks.len() * 64);
    out.push_str(HEADER);
    out.push('\n');
    for track in tracks {
        out.push_str(&format!(
            "#EXTINF:-1,{} - {}\n",
            track.performing_artist(),
            track.title()
        ));
        out.push_str(&format!(
            "# Search: {} by {}\n",
            track.title(),
            track.performing_artist()
        ));
    }
    out
}

/// Writes `tracks` to an M3U file and returns where it went.
pub fn export_playlist(
    tracks: &[Track],
    playlist_name: &str,
    target: &ExportTarget,
) -> Result<PathBuf, ExportError> {
    let path = target.resolve(playlist_name);
    write_file(&path, &render_m3u(tracks))?;
    log::info!("Exported {} tracks to {}", tracks.len(), path.display());
    Ok(path)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, contents).map_err(io_error)
}
