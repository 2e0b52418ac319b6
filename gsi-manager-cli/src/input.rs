use crate::error::{CliError, CliResult};
use gsi_manager::LifecycleEvent;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

/// Where the event JSON comes from.
pub enum InputSource {
    /// From a file on disk.
    File(PathBuf),
    /// From stdin (piped).
    Stdin,
}

/// Resolve the input source: `--event` file, else piped stdin.
pub fn resolve_input(file_flag: Option<&Path>) -> CliResult<InputSource> {
    if let Some(f) = file_flag {
        return Ok(InputSource::File(f.to_path_buf()));
    }
    if !io::stdin().is_terminal() {
        return Ok(InputSource::Stdin);
    }
    Err(CliError::Usage(format!(
        "no event provided\n  {} use --event <file>, or pipe the event JSON via stdin",
        colored::Colorize::bold(colored::Colorize::cyan("help:"))
    )))
}

/// Read content from the resolved input source.
pub fn read_input(source: &InputSource) -> CliResult<String> {
    match source {
        InputSource::File(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::Input(format!("failed to read {}: {e}", path.display()))),
        InputSource::Stdin => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Read and parse a lifecycle event.
pub fn read_event(file_flag: Option<&Path>) -> CliResult<LifecycleEvent> {
    let source = resolve_input(file_flag)?;
    let content = read_input(&source)?;
    if content.trim().is_empty() {
        return Err(CliError::Input("event input is empty".into()));
    }
    let event: LifecycleEvent = serde_json::from_str(&content)
        .map_err(|e| CliError::Input(format!("invalid lifecycle event: {e}")))?;
    Ok(event)
}
