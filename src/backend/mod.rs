pub mod apple_music;
pub mod itunes_com;
pub mod osascript;
pub mod powershell;
pub mod resolver;

use crate::model::{AddOutcome, Track};

pub use apple_music::AppleScriptDriver;
pub use itunes_com::ComDriver;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("No automation backend is available on this host")]
    Unavailable,
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Scripting bridge failed: {0}")]
    Script(String),
    #[error("Host application error: {0}")]
    Host(String),
    #[error("Unexpected response from host application: {0}")]
    UnexpectedResponse(String),
    #[error("Playlist '{0}' not found in the library")]
    PlaylistNotFound(String),
    #[error("Automation session closed unexpectedly")]
    SessionClosed,
}

/// The two operations every live backend supports.
///
/// Calls take `&mut self` and are awaited one at a time; the host automation
/// layers behind them are single-session resources.
#[async_trait::async_trait]
pub trait PlaylistAutomation: Send {
    /// Creates the playlist unless one with exactly this name already exists.
    async fn ensure_playlist(&mut self, name: &str) -> Result<(), BackendError>;

    /// Searches the host library for `track` and adds the top match.
    ///
    /// Host failures come back as `AddOutcome::Error`, never as `Err`.
    async fn search_and_add_track(&mut self, playlist_name: &str, track: &Track) -> AddOutcome;
}

/// Automation backend selected once per run by the resolver.
pub enum Backend {
    AppleScript(AppleScriptDriver),
    Com(ComDriver),
    /// No live automation; the engine exports to a file instead.
    Null,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::AppleScript(_) => "AppleScript",
            Backend::Com(_) => "COM",
            Backend::Null => "file export",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Backend::Null)
    }

    pub async fn ensure_playlist(&mut self, name: &str) -> Result<(), BackendError> {
        match self {
            Backend::AppleScript(driver) => driver.ensure_playlist(name).await,
            Backend::Com(driver) => driver.ensure_playlist(name).await,
            Backend::Null => Err(BackendError::Unavailable),
        }
    }

    pub async fn search_and_add_track(&mut self, playlist_name: &str, track: &Track) -> AddOutcome {
        match self {
            Backend::AppleScript(driver) => driver.search_and_add_track(playlist_name, track).await,
            Backend::Com(driver) => driver.search_and_add_track(playlist_name, track).await,
            Backend::Null => AddOutcome::Error(BackendError::Unavailable.to_string()),
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backend({})", self.name())
    }
}
