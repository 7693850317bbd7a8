use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::backend::osascript::Osascript;
use crate::backend::powershell::{ITUNES_PROG_ID, PowerShellConnector, ps_string};
use crate::backend::{AppleScriptDriver, Backend, ComDriver};
use crate::ports::automation::HostProbe;

const APP_PROBE_SCRIPT: &str = "on run argv
    return id of application (item 1 of argv)
end run";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            other => Platform::Other(other.to_string()),
        }
    }
}

/// The backend picked for this run and, when it had to fall back, why.
#[derive(Debug)]
pub struct Resolution {
    pub backend: Backend,
    pub warning: Option<String>,
}

impl Resolution {
    fn live(backend: Backend) -> Self {
        Self {
            backend,
            warning: None,
        }
    }

    fn degraded(reason: String) -> Self {
        log::warn!("{}; falling back to playlist file export", reason);
        Self {
            backend: Backend::Null,
            warning: Some(reason),
        }
    }
}

/// Picks the automation backend for this run. Never fails: anything missing
/// on the host degrades to the Null backend with a warning.
pub async fn resolve_backend(
    platform: &Platform,
    export_only: bool,
    music_app: &str,
    probe: &dyn HostProbe,
) -> Resolution {
    if export_only {
        log::info!("Export-only run requested");
        return Resolution {
            backend: Backend::Null,
            warning: None,
        };
    }

    match platform {
        Platform::MacOs => {
            let Some(osascript) = probe.find_program("osascript") else {
                return Resolution::degraded("osascript was not found on PATH".to_string());
            };
            if !probe.scriptable_app_available(&osascript, music_app).await {
                return Resolution::degraded(format!(
                    "The {} app is not available to AppleScript",
                    music_app
                ));
            }
            log::info!("Using AppleScript backend ({})", music_app);
            Resolution::live(Backend::AppleScript(AppleScriptDriver::new(
                Box::new(Osascript::new(osascript)),
                music_app,
            )))
        }
        Platform::Windows => {
            let Some(powershell) = probe
                .find_program("powershell")
                .or_else(|| probe.find_program("pwsh"))
            else {
                return Resolution::degraded("PowerShell was not found on PATH".to_string());
            };
            if !probe.com_class_registered(&powershell, ITUNES_PROG_ID).await {
                return Resolution::degraded(format!(
                    "COM class {} is not registered (is iTunes installed?)",
                    ITUNES_PROG_ID
                ));
            }
            log::info!("Using COM backend ({})", ITUNES_PROG_ID);
            Resolution::live(Backend::Com(ComDriver::new(Box::new(
                PowerShellConnector::new(powershell, ITUNES_PROG_ID),
            ))))
        }
        Platform::Other(os) => Resolution::degraded(format!(
            "No music app automation is available on {}",
            os
        )),
    }
}

/// Probes the real host with `which` and short-lived child processes.
pub struct SystemProbe;

#[async_trait::async_trait]
impl HostProbe for SystemProbe {
    fn find_program(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    async fn scriptable_app_available(&self, osascript: &Path, app: &str) -> bool {
        let output = Command::new(osascript)
            .arg("-e")
            .arg(APP_PROBE_SCRIPT)
            .arg(app)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                log::debug!(
                    "App probe for {} failed: {}",
                    app,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                log::debug!("Failed to run {}: {}", osascript.display(), e);
                false
            }
        }
    }

    async fn com_class_registered(&self, powershell: &Path, prog_id: &str) -> bool {
        // Checks registration only; binding happens lazily in the COM driver
        let statement = format!(
            "if ([type]::GetTypeFromProgID({})) {{ 'yes' }} else {{ 'no' }}",
            ps_string(prog_id)
        );
        let output = Command::new(powershell)
            .args(["-NoLogo", "-NoProfile", "-NonInteractive", "-Command"])
            .arg(statement)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => String::from_utf8_lossy(&output.stdout).trim() == "yes",
            Err(e) => {
                log::debug!("Failed to run {}: {}", powershell.display(), e);
                false
            }
        }
    }
}
