use std::collections::HashMap;

use crate::backend::{BackendError, PlaylistAutomation};
use crate::model::{AddOutcome, Track};
use crate::ports::automation::{ComConnector, ComSession, SourceKind};

/// Where a playlist lives in the host object model (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaylistLocation {
    source: usize,
    playlist: usize,
}

/// Drives iTunes for Windows through its COM automation interface.
///
/// The session is bound on first use and kept for the rest of the run.
/// Dropping the driver drops the session.
pub struct ComDriver {
    connector: Box<dyn ComConnector>,
    session: Option<Box<dyn ComSession>>,
    locations: HashMap<String, PlaylistLocation>,
}

impl ComDriver {
    pub fn new(connector: Box<dyn ComConnector>) -> Self {
        Self {
            connector,
            session: None,
            locations: HashMap::new(),
        }
    }

    async fn session(&mut self) -> Result<&mut Box<dyn ComSession>, BackendError> {
        if self.session.is_none() {
            log::info!("Binding to the host application over COM");
            self.session = Some(self.connector.connect().await?);
        }
        self.session.as_mut().ok_or(BackendError::SessionClosed)
    }

    async fn location_of(&mut self, playlist_name: &str) -> Result<PlaylistLocation, BackendError> {
        if let Some(location) = self.locations.get(playlist_name) {
            return Ok(*location);
        }

        let session = self.session().await?;
        let location = locate_playlist(&mut **session, playlist_name)
            .await?
            .ok_or_else(|| BackendError::PlaylistNotFound(playlist_name.to_string()))?;
        self.locations.insert(playlist_name.to_string(), location);
        Ok(location)
    }

    async fn try_search_and_add(
        &mut self,
        playlist_name: &str,
        track: &Track,
    ) -> Result<AddOutcome, BackendError> {
        let location = self.location_of(playlist_name).await?;
        let session = self.session().await?;

        let matches = session.search_library(&track.search_query()).await?;
        if matches == 0 {
            return Ok(AddOutcome::NotFound);
        }

        log::debug!("{} matches for '{}', adding the first", matches, track);
        session
            .add_search_result(1, location.source, location.playlist)
            .await?;
        Ok(AddOutcome::Added)
    }
}

/// Folds line breaks the way `ComSession::playlist_names` reports them.
fn fold_line_breaks(name: &str) -> String {
    name.replace(['\r', '\n'], " ")
}

/// Scans library sources for a playlist named exactly `name`. First match wins.
async fn locate_playlist(
    session: &mut dyn ComSession,
    name: &str,
) -> Result<Option<PlaylistLocation>, BackendError> {
    let wanted = fold_line_breaks(name);
    let sources = session.sources().await?;
    for source in sources.iter().filter(|s| s.kind == SourceKind::Library) {
        log::debug!("Looking for '{}' in source '{}'", name, source.name);
        let names = session.playlist_names(source.index).await?;
        if let Some(position) = names.iter().position(|n| *n == wanted) {
            return Ok(Some(PlaylistLocation {
                source: source.index,
                playlist: position + 1,
            }));
        }
    }
    Ok(None)
}

#[async_trait::async_trait]
impl PlaylistAutomation for ComDriver {
    async fn ensure_playlist(&mut self, name: &str) -> Result<(), BackendError> {
        let session = self.session().await?;
        match locate_playlist(&mut **session, name).await? {
            Some(location) => {
                log::info!("Playlist '{}' already exists", name);
                self.locations.insert(name.to_string(), location);
            }
            None => {
                session.create_playlist(name).await?;
                log::info!("Created playlist '{}'", name);
            }
        }
        Ok(())
    }

    async fn search_and_add_track(&mut self, playlist_name: &str, track: &Track) -> AddOutcome {
        match self.try_search_and_add(playlist_name, track).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("COM call failed for '{}': {}", track, e);
                AddOutcome::Error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::automation::{ComSource, MockComConnector, MockComSession};
    use mockall::predicate::{eq, function};

    fn sources() -> Vec<ComSource> {
        vec![
            ComSource {
                index: 1,
                kind: SourceKind::Other(6),
                name: "Shared".to_string(),
            },
            ComSource {
                index: 2,
                kind: SourceKind::Library,
                name: "Library".to_string(),
            },
        ]
    }

    fn connector(session: MockComSession) -> MockComConnector {
        let mut connector = MockComConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session) as Box<dyn ComSession>));
        connector
    }

    #[tokio::test]
    async fn test_ensure_existing_playlist_twice_creates_nothing() {
        let mut session = MockComSession::new();
        session.expect_sources().times(2).returning(|| Ok(sources()));
        session
            .expect_playlist_names()
            .with(eq(2))
            .times(2)
            .returning(|_| Ok(vec!["Music".to_string(), "Live Show".to_string()]));
        session.expect_create_playlist().times(0);

        let mut driver = ComDriver::new(Box::new(connector(session)));
        driver.ensure_playlist("Live Show").await.unwrap();
        driver.ensure_playlist("Live Show").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_missing_playlist_creates_it() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| Ok(sources()));
        session
            .expect_playlist_names()
            .returning(|_| Ok(vec!["Music".to_string()]));
        session
            .expect_create_playlist()
            .with(function(|name: &str| name == "Live Show"))
            .times(1)
            .returning(|_| Ok(()));

        let mut driver = ComDriver::new(Box::new(connector(session)));
        driver.ensure_playlist("Live Show").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_matches_names_with_line_breaks() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| Ok(sources()));
        session
            .expect_playlist_names()
            .returning(|_| Ok(vec!["Night One  Encore".to_string()]));
        session.expect_create_playlist().times(0);

        let mut driver = ComDriver::new(Box::new(connector(session)));
        driver.ensure_playlist("Night One\r\nEncore").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_ignores_non_library_sources() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| Ok(sources()));
        session.expect_playlist_names().with(eq(1)).times(0);
        session
            .expect_playlist_names()
            .with(eq(2))
            .returning(|_| Ok(vec![]));
        session
            .expect_create_playlist()
            .times(1)
            .returning(|_| Ok(()));

        let mut driver = ComDriver::new(Box::new(connector(session)));
        driver.ensure_playlist("Live Show").await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_fails_ensure() {
        let mut connector = MockComConnector::new();
        connector
            .expect_connect()
            .returning(|| Err(BackendError::Host("class not registered".to_string())));

        let mut driver = ComDriver::new(Box::new(connector));
        let err = driver.ensure_playlist("Live Show").await.unwrap_err();
        assert!(err.to_string().contains("class not registered"));
    }

    #[tokio::test]
    async fn test_binding_is_reused_and_top_match_is_added() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| Ok(sources()));
        session
            .expect_playlist_names()
            .returning(|_| Ok(vec!["Music".to_string(), "Live Show".to_string()]));
        session
            .expect_search_library()
            .with(function(|query: &str| query == "Song A Artist X"))
            .returning(|_| Ok(7));
        session
            .expect_search_library()
            .with(function(|query: &str| query == "Song B Artist Y"))
            .returning(|_| Ok(0));
        session
            .expect_add_search_result()
            .with(eq(1), eq(2), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(()));

        // connector() expects exactly one connect for the whole run
        let mut driver = ComDriver::new(Box::new(connector(session)));
        driver.ensure_playlist("Live Show").await.unwrap();

        let first = driver
            .search_and_add_track("Live Show", &Track::new("Song A", "Artist X"))
            .await;
        let second = driver
            .search_and_add_track("Live Show", &Track::new("Song B", "Artist Y"))
            .await;

        assert_eq!(first, AddOutcome::Added);
        assert_eq!(second, AddOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_first_matching_playlist_wins() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| {
            Ok(vec![
                ComSource {
                    index: 1,
                    kind: SourceKind::Library,
                    name: "Library".to_string(),
                },
                ComSource {
                    index: 3,
                    kind: SourceKind::Library,
                    name: "Second Library".to_string(),
                },
            ])
        });
        session
            .expect_playlist_names()
            .with(eq(1))
            .returning(|_| Ok(vec!["Dup".to_string(), "Dup".to_string()]));
        session.expect_playlist_names().with(eq(3)).times(0);
        session.expect_search_library().returning(|_| Ok(1));
        session
            .expect_add_search_result()
            .with(eq(1), eq(1), eq(1))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut driver = ComDriver::new(Box::new(connector(session)));
        let outcome = driver
            .search_and_add_track("Dup", &Track::new("Song", "Band"))
            .await;
        assert_eq!(outcome, AddOutcome::Added);
    }

    #[tokio::test]
    async fn test_host_error_becomes_outcome() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| Ok(sources()));
        session
            .expect_playlist_names()
            .returning(|_| Ok(vec!["Live Show".to_string()]));
        session
            .expect_search_library()
            .returning(|_| Err(BackendError::Host("RPC server unavailable".to_string())));

        let mut driver = ComDriver::new(Box::new(connector(session)));
        let outcome = driver
            .search_and_add_track("Live Show", &Track::new("Song", "Band"))
            .await;
        assert!(matches!(outcome, AddOutcome::Error(msg) if msg.contains("RPC server unavailable")));
    }

    #[tokio::test]
    async fn test_missing_destination_is_an_error_outcome() {
        let mut session = MockComSession::new();
        session.expect_sources().returning(|| Ok(sources()));
        session.expect_playlist_names().returning(|_| Ok(vec![]));
        session.expect_search_library().times(0);

        let mut driver = ComDriver::new(Box::new(connector(session)));
        let outcome = driver
            .search_and_add_track("Gone", &Track::new("Song", "Band"))
            .await;
        assert!(matches!(outcome, AddOutcome::Error(msg) if msg.contains("Gone")));
    }
}
