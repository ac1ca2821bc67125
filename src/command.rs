use crate::error::{CollectError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// A command posted into the command file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    End,
    Batch,
    /// Anything else, including an empty file. Observed but ignored.
    Other(String),
}

impl Command {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => Command::Stop,
            "end" => Command::End,
            "batch" => Command::Batch,
            other => Command::Other(other.to_string()),
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Command::Stop | Command::End)
    }
}

/// Single-slot mailbox backed by a text file.
///
/// The channel never creates the file: an external controller opts in by
/// creating it, and the session only reads and clears what is there.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    path: PathBuf,
}

impl CommandChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the pending command, `None` if the file does not exist.
    pub fn get_command(&self) -> Result<Option<Command>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                tracing::debug!("cmdfile: {}, cmd = {:?}", self.path.display(), raw);
                Ok(Some(Command::parse(&raw)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CollectError::io(&self.path, e)),
        }
    }

    /// Replace the file contents with `cmd`. No-op if the file does not exist.
    ///
    /// Writes through a sibling file and renames it into place so a reader
    /// sees either the old or the new command, never a partial one.
    pub fn set_command(&self, cmd: &str) -> Result<bool> {
        if !self.path.is_file() {
            return Ok(false);
        }

        let staging = self.staging_path();
        fs::write(&staging, cmd).map_err(|e| CollectError::io(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| CollectError::io(&self.path, e))?;

        tracing::info!("write command {:?} into cmdfile {}", cmd, self.path.display());
        Ok(true)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
