use crate::error::TransferError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs one one-way mirror of a local directory to a remote path.
///
/// Returns the tool's combined output on success.
pub trait SyncTool {
    fn mirror(&self, source: &str, remote_path: &str, config: &Path)
    -> Result<String, TransferError>;
}

pub struct Rclone {
    program: PathBuf,
}

impl Rclone {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves `program` on `PATH`.
    pub fn locate(program: &str) -> Result<Self> {
        let path = which::which(program).with_context(|| {
            format!("{program} is not installed.\nInstall: https://rclone.org/install/")
        })?;
        Ok(Self::new(path))
    }
}

/// `sync` deletes remote files missing locally; `--links` uploads symlinks
/// as links instead of following them.
pub fn sync_args<'a>(source: &'a str, remote_path: &'a str) -> [&'a str; 4] {
    ["sync", "--links", source, remote_path]
}

impl SyncTool for Rclone {
    fn mirror(
        &self,
        source: &str,
        remote_path: &str,
        config: &Path,
    ) -> Result<String, TransferError> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(sync_args(source, remote_path))
            .env("RCLONE_CONFIG", config)
            .output()
            .map_err(|source| TransferError::Launch {
                program: program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(TransferError::Exit {
                program,
                code: output.status.code(),
                output: combined,
            });
        }

        Ok(combined)
    }
}
