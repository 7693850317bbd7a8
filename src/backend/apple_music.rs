use crate::backend::{BackendError, PlaylistAutomation};
use crate::model::{AddOutcome, Track};
use crate::ports::automation::{ScriptRequest, ScriptRunner};

// Both scripts take their inputs from argv, so titles and names containing
// quotes or backslashes never touch the script source. `using terms from`
// needs an application that exists at compile time, so each dictionary gets
// its own copy of the scripts.

macro_rules! ensure_playlist_script {
    ($terms:literal) => {
        concat!(
            r#"on run argv
    set appName to item 1 of argv
    set playlistName to item 2 of argv
    using terms from application ""#,
            $terms,
            r#""
        tell application appName
            if exists playlist playlistName then
                return "exists"
            end if
            make new playlist with properties {name:playlistName}
            return "created"
        end tell
    end using terms from
end run"#
        )
    };
}

macro_rules! search_and_add_script {
    ($terms:literal) => {
        concat!(
            r#"on run argv
    set appName to item 1 of argv
    set playlistName to item 2 of argv
    set searchQuery to item 3 of argv
    using terms from application ""#,
            $terms,
            r#""
        tell application appName
            try
                set searchResults to search playlist "Library" for searchQuery
                if (count of searchResults) > 0 then
                    duplicate (item 1 of searchResults) to playlist playlistName
                    return "success"
                else
                    return "not found"
                end if
            on error errMsg
                return "error: " & errMsg
            end try
        end tell
    end using terms from
end run"#
        )
    };
}

/// The scripts compiled against one application's dictionary.
#[derive(Debug, PartialEq, Eq)]
struct Scripts {
    ensure_playlist: &'static str,
    search_and_add: &'static str,
}

const MUSIC_SCRIPTS: Scripts = Scripts {
    ensure_playlist: ensure_playlist_script!("Music"),
    search_and_add: search_and_add_script!("Music"),
};

// macOS 10.14 and earlier ship iTunes instead of Music
const ITUNES_SCRIPTS: Scripts = Scripts {
    ensure_playlist: ensure_playlist_script!("iTunes"),
    search_and_add: search_and_add_script!("iTunes"),
};

fn scripts_for(app: &str) -> &'static Scripts {
    if app.eq_ignore_ascii_case("iTunes") {
        &ITUNES_SCRIPTS
    } else {
        &MUSIC_SCRIPTS
    }
}

/// Drives the macOS Music app through `osascript`.
pub struct AppleScriptDriver {
    runner: Box<dyn ScriptRunner>,
    app: String,
    scripts: &'static Scripts,
}

impl AppleScriptDriver {
    pub fn new(runner: Box<dyn ScriptRunner>, app: impl Into<String>) -> Self {
        let app = app.into();
        Self {
            runner,
            scripts: scripts_for(&app),
            app,
        }
    }

    fn ensure_request(&self, name: &str) -> ScriptRequest {
        ScriptRequest {
            script: self.scripts.ensure_playlist,
            args: vec![self.app.clone(), name.to_string()],
        }
    }

    fn search_request(&self, playlist_name: &str, track: &Track) -> ScriptRequest {
        ScriptRequest {
            script: self.scripts.search_and_add,
            args: vec![
                self.app.clone(),
                playlist_name.to_string(),
                track.search_query(),
            ],
        }
    }
}

fn parse_add_response(response: &str) -> AddOutcome {
    match response {
        "success" => AddOutcome::Added,
        "not found" => AddOutcome::NotFound,
        other => match other.strip_prefix("error:") {
            Some(message) => AddOutcome::Error(message.trim().to_string()),
            None => AddOutcome::Error(BackendError::UnexpectedResponse(other.to_string()).to_string()),
        },
    }
}

#[async_trait::async_trait]
impl PlaylistAutomation for AppleScriptDriver {
    async fn ensure_playlist(&mut self, name: &str) -> Result<(), BackendError> {
        let response = self.runner.run(&self.ensure_request(name)).await?;
        match response.as_str() {
            "created" => {
                log::info!("Created playlist '{}' in {}", name, self.app);
                Ok(())
            }
            "exists" => {
                log::info!("Playlist '{}' already exists in {}", name, self.app);
                Ok(())
            }
            other => Err(BackendError::UnexpectedResponse(other.to_string())),
        }
    }

    async fn search_and_add_track(&mut self, playlist_name: &str, track: &Track) -> AddOutcome {
        let request = self.search_request(playlist_name, track);
        log::debug!("Searching {} for '{}'", self.app, request.args[2]);

        match self.runner.run(&request).await {
            Ok(response) => parse_add_response(&response),
            Err(e) => {
                log::warn!("AppleScript call failed for '{}': {}", track, e);
                AddOutcome::Error(e.to_string())
            }
        }
    }
}
