use std::fmt;

/// One performed song with the artist that should be searched for.
///
/// For covers this is the original artist, otherwise the headliner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    title: String,
    performing_artist: String,
}

impl Track {
    pub fn new(title: impl Into<String>, performing_artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            performing_artist: performing_artist.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn performing_artist(&self) -> &str {
        &self.performing_artist
    }

    /// Query handed to the host library's search: title, one space, artist.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.performing_artist)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.performing_artist)
    }
}

/// Tracks in performance order. Repeats are kept.
pub type TrackList = Vec<Track>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistIdentity {
    pub name: String,
}

impl PlaylistIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of adding one track to the destination playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    NotFound,
    Error(String),
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackResult {
    pub track: Track,
    pub outcome: AddOutcome,
}

/// Aggregate outcome of one live synchronization run.
///
/// Counts are derived from `tracks`, so `added + not_found_or_failed == total`
/// always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub playlist_name: String,
    pub tracks: Vec<TrackResult>,
}

impl SyncReport {
    pub fn new(playlist_name: impl Into<String>, tracks: Vec<TrackResult>) -> Self {
        Self {
            playlist_name: playlist_name.into(),
            tracks,
        }
    }

    pub fn total(&self) -> usize {
        self.tracks.len()
    }

    pub fn added(&self) -> usize {
        self.tracks.iter().filter(|t| t.outcome.is_added()).count()
    }

    pub fn not_found_or_failed(&self) -> usize {
        self.total() - self.added()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_joins_title_and_artist() {
        let track = Track::new("Bloodbuzz Ohio", "The National");
        assert_eq!(track.search_query(), "Bloodbuzz Ohio The National");
    }

    #[test]
    fn test_report_counts_add_up() {
        let report = SyncReport::new(
            "Show",
            vec![
                TrackResult {
                    track: Track::new("A", "X"),
                    outcome: AddOutcome::Added,
                },
                TrackResult {
                    track: Track::new("B", "X"),
                    outcome: AddOutcome::Error("boom".to_string()),
                },
                TrackResult {
                    track: Track::new("C", "X"),
                    outcome: AddOutcome::NotFound,
                },
            ],
        );

        assert_eq!(report.total(), 3);
        assert_eq!(report.added(), 1);
        assert_eq!(report.not_found_or_failed(), 2);
    }
}
