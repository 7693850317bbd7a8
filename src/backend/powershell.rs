use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::backend::BackendError;
use crate::ports::automation::{ComConnector, ComSession, ComSource, SourceKind};

pub const ITUNES_PROG_ID: &str = "iTunes.Application";

const END_MARKER: &str = "<<setlist-sync:end>>";
/// Printed by the catch block after the exception message, right before the
/// end marker. Data lines never end a response with it.
const ERROR_MARKER: &str = "<<setlist-sync:err>>";

/// Arguments that make PowerShell read statements from stdin, one per line.
const SESSION_ARGS: [&str; 5] = ["-NoLogo", "-NoProfile", "-NonInteractive", "-Command", "-"];

/// Renders `value` as a PowerShell string expression.
///
/// Printable ASCII goes into single-quoted literals with `'` doubled. Every
/// other character, including line breaks and the typographic quotes
/// PowerShell also treats as delimiters, is emitted as a `[char]` code point
/// so nothing but ASCII ever crosses the pipe.
pub fn ps_string(value: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut literal = String::new();

    for ch in value.chars() {
        if ch.is_ascii() && !ch.is_ascii_control() {
            if ch == '\'' {
                literal.push_str("''");
            } else {
                literal.push(ch);
            }
            continue;
        }

        // Concatenation starts from a string so `+` never does char arithmetic
        if !literal.is_empty() || parts.is_empty() {
            parts.push(format!("'{}'", literal));
            literal.clear();
        }
        let code = ch as u32;
        if code > 0xFFFF {
            parts.push(format!("[char]::ConvertFromUtf32(0x{:X})", code));
        } else {
            parts.push(format!("[char]0x{:04X}", code));
        }
    }

    if parts.is_empty() {
        return format!("'{}'", literal);
    }
    if !literal.is_empty() {
        parts.push(format!("'{}'", literal));
    }
    format!("({})", parts.join(" + "))
}

/// Wraps one statement so the session always answers with an end marker.
fn framed(statement: &str) -> String {
    format!(
        "try {{ {} }} catch {{ Write-Output ($_.Exception.Message -replace \"[`r`n]+\", ' '); Write-Output '{}' }}; Write-Output '{}'\n",
        statement, ERROR_MARKER, END_MARKER
    )
}

/// Turns the lines printed before the end marker into a result.
///
/// A response is an error only when its last line is the error marker; the
/// line before it carries the flattened exception message.
fn into_result(mut lines: Vec<String>) -> Result<Vec<String>, BackendError> {
    if lines.last().map(String::as_str) != Some(ERROR_MARKER) {
        return Ok(lines);
    }
    lines.pop();
    let message = lines.pop().unwrap_or_default();
    Err(BackendError::Host(message.trim().to_string()))
}

fn parse_source_line(line: &str) -> Result<ComSource, BackendError> {
    let mut fields = line.splitn(3, '\t');
    let (Some(index), Some(kind), Some(name)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(BackendError::UnexpectedResponse(line.to_string()));
    };

    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| BackendError::UnexpectedResponse(line.to_string()))?;
    let kind = kind
        .trim()
        .parse::<i32>()
        .map_err(|_| BackendError::UnexpectedResponse(line.to_string()))?;

    Ok(ComSource {
        index,
        kind: SourceKind::from(kind),
        name: name.to_string(),
    })
}

fn parse_count(lines: &[String]) -> Result<usize, BackendError> {
    let line = lines
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| BackendError::UnexpectedResponse("empty search response".to_string()))?;
    line.trim()
        .parse()
        .map_err(|_| BackendError::UnexpectedResponse(line.clone()))
}

/// Opens PowerShell sessions bound to a COM application.
pub struct PowerShellConnector {
    program: PathBuf,
    prog_id: String,
}

impl PowerShellConnector {
    pub fn new(program: PathBuf, prog_id: impl Into<String>) -> Self {
        Self {
            program,
            prog_id: prog_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl ComConnector for PowerShellConnector {
    async fn connect(&self) -> Result<Box<dyn ComSession>, BackendError> {
        let mut child = Command::new(&self.program)
            .args(SESSION_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(BackendError::SessionClosed)?;
        let stdout = child.stdout.take().ok_or(BackendError::SessionClosed)?;

        let mut session = PowerShellSession {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        session
            .execute(&format!(
                "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8; $app = New-Object -ComObject {}",
                ps_string(&self.prog_id)
            ))
            .await?;
        log::debug!("Bound {} in PowerShell session", self.prog_id);

        Ok(Box::new(session))
    }
}

/// A long-lived PowerShell process holding the `$app` COM binding.
///
/// The process is killed when the session is dropped, which releases the binding.
pub struct PowerShellSession {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl PowerShellSession {
    async fn execute(&mut self, statement: &str) -> Result<Vec<String>, BackendError> {
        log::trace!("PowerShell <- {}", statement);
        let map_io = |_: std::io::Error| BackendError::SessionClosed;

        self.stdin
            .write_all(framed(statement).as_bytes())
            .await
            .map_err(map_io)?;
        self.stdin.flush().await.map_err(map_io)?;

        let mut lines = Vec::new();
        loop {
            match self.stdout.next_line().await.map_err(map_io)? {
                Some(line) if line.trim_end() == END_MARKER => break,
                Some(line) => lines.push(line.trim_end().to_string()),
                None => return Err(BackendError::SessionClosed),
            }
        }

        into_result(lines)
    }
}

#[async_trait::async_trait]
impl ComSession for PowerShellSession {
    async fn sources(&mut self) -> Result<Vec<ComSource>, BackendError> {
        let lines = self
            .execute(
                "$sources = $app.Sources; for ($i = 1; $i -le $sources.Count; $i++) { $s = $sources.Item($i); Write-Output (\"{0}`t{1}`t{2}\" -f $i, [int]$s.Kind, $s.Name) }",
            )
            .await?;
        lines.iter().map(|line| parse_source_line(line)).collect()
    }

    async fn playlist_names(&mut self, source: usize) -> Result<Vec<String>, BackendError> {
        self.execute(&format!(
            "$playlists = $app.Sources.Item({}).Playlists; for ($i = 1; $i -le $playlists.Count; $i++) {{ Write-Output ($playlists.Item($i).Name -replace \"[`r`n]\", ' ') }}",
            source
        ))
        .await
    }

    async fn create_playlist(&mut self, name: &str) -> Result<(), BackendError> {
        self.execute(&format!("[void]$app.CreatePlaylist({})", ps_string(name)))
            .await?;
        Ok(())
    }

    async fn search_library(&mut self, query: &str) -> Result<usize, BackendError> {
        // 0 = ITPlaylistSearchFieldAll; Search returns $null when nothing matches
        let lines = self
            .execute(&format!(
                "$results = $app.LibraryPlaylist.Search({}, 0); if ($null -eq $results) {{ Write-Output 0 }} else {{ Write-Output $results.Count }}",
                ps_string(query)
            ))
            .await?;
        parse_count(&lines)
    }

    async fn add_search_result(
        &mut self,
        result: usize,
        source: usize,
        playlist: usize,
    ) -> Result<(), BackendError> {
        self.execute(&format!(
            "[void]$app.Sources.Item({}).Playlists.Item({}).AddTrack($results.Item({}))",
            source, playlist, result
        ))
        .await?;
        Ok(())
    }
}
