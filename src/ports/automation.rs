use std::path::{Path, PathBuf};

use crate::backend::BackendError;

/// A constant AppleScript program plus the values handed to its `run` handler.
///
/// Track metadata travels only through `args`; the script text never
/// contains user data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    pub script: &'static str,
    pub args: Vec<String>,
}

/// Runs AppleScript through the OS scripting bridge.
///
/// Implementations live in `backend::osascript` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Returns the script's trimmed result, or the bridge's error output.
    async fn run(&self, request: &ScriptRequest) -> Result<String, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Library,
    Other(i32),
}

impl From<i32> for SourceKind {
    fn from(code: i32) -> Self {
        // ITSourceKindLibrary
        if code == 1 {
            SourceKind::Library
        } else {
            SourceKind::Other(code)
        }
    }
}

/// A source exposed by the host application's COM object model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComSource {
    /// 1-based position in the application's `Sources` collection
    pub index: usize,
    pub kind: SourceKind,
    pub name: String,
}

/// Opens a bound session with the host application.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ComConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ComSession>, BackendError>;
}

/// The slice of the host application's COM object model the driver uses.
///
/// All indexes are 1-based, following the host's collection convention.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ComSession: Send {
    async fn sources(&mut self) -> Result<Vec<ComSource>, BackendError>;

    /// Playlist names of one source, in collection order. Line breaks inside
    /// a name come back as spaces.
    async fn playlist_names(&mut self, source: usize) -> Result<Vec<String>, BackendError>;

    async fn create_playlist(&mut self, name: &str) -> Result<(), BackendError>;

    /// Searches the main library and remembers the results for
    /// `add_search_result`. Returns the number of matches.
    async fn search_library(&mut self, query: &str) -> Result<usize, BackendError>;

    /// Adds item `result` of the last search to playlist `playlist` of source `source`.
    async fn add_search_result(
        &mut self,
        result: usize,
        source: usize,
        playlist: usize,
    ) -> Result<(), BackendError>;
}

/// Optional host facilities the resolver checks before picking a live backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HostProbe: Send + Sync {
    fn find_program(&self, program: &str) -> Option<PathBuf>;

    async fn scriptable_app_available(&self, osascript: &Path, app: &str) -> bool;

    async fn com_class_registered(&self, powershell: &Path, prog_id: &str) -> bool;
}
