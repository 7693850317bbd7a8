use std::path::PathBuf;

use tokio::process::Command;

use crate::backend::BackendError;
use crate::ports::automation::{ScriptRequest, ScriptRunner};

/// Runs scripts by spawning `osascript` once per request.
pub struct Osascript {
    program: PathBuf,
}

impl Osascript {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

#[async_trait::async_trait]
impl ScriptRunner for Osascript {
    async fn run(&self, request: &ScriptRequest) -> Result<String, BackendError> {
        // `osascript -e <script> <args...>` hands the trailing arguments to `on run argv`
        let output = Command::new(&self.program)
            .arg("-e")
            .arg(request.script)
            .args(&request.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::debug!("osascript exited with {}: {}", output.status, stderr);
            Err(BackendError::Script(stderr))
        }
    }
}
