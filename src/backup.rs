use crate::error::{BackupError, TransferError};
use crate::google::ClientCredentials;
use crate::rclone::{Rclone, SyncTool};
use crate::remote::{REMOTE_NAME, RemoteConfig};
use crate::target::{BackupItem, parse_targets};
use std::path::Path;
use tracing::{error, info, info_span};

/// One backup pass: the parsed targets plus the rclone config they run against.
pub struct Backup<T = Rclone> {
    items: Vec<BackupItem>,
    config: RemoteConfig,
    tool: T,
}

impl<T: SyncTool> Backup<T> {
    /// Parses `targets` and writes the run's rclone config.
    pub fn new(
        targets: &str,
        creds: &ClientCredentials,
        token: &str,
        tool: T,
    ) -> Result<Self, BackupError> {
        let items = parse_targets(targets)?;
        let config = RemoteConfig::materialize(creds, token).map_err(BackupError::ConfigWrite)?;
        info!(config = %config.path().display(), targets = items.len(), "Backup config initialized");
        Ok(Self {
            items,
            config,
            tool,
        })
    }

    pub fn items(&self) -> &[BackupItem] {
        &self.items
    }

    pub fn config_path(&self) -> &Path {
        self.config.path()
    }

    /// Mirrors every item in order.
    ///
    /// With `stop_on_error` the first failure ends the run and is returned.
    /// Otherwise failures are logged and the run always succeeds.
    pub fn run(&self, stop_on_error: bool) -> Result<(), BackupError> {
        let _span = info_span!("backup").entered();
        for item in &self.items {
            if let Err(e) = self.transfer(item) {
                if stop_on_error {
                    return Err(BackupError::BackupFailed {
                        item: item.clone(),
                        source: e,
                    });
                }
                error!(
                    source = %item.source,
                    destination = %item.destination,
                    error = %e,
                    "Backup failed"
                );
            }
        }
        Ok(())
    }

    pub fn transfer(&self, item: &BackupItem) -> Result<(), TransferError> {
        info!(source = %item.source, destination = %item.destination, "Backup started");
        let remote_path = remote_path(&item.destination);
        let output = self
            .tool
            .mirror(&item.source, &remote_path, self.config.path())?;
        info!(
            source = %item.source,
            destination = %item.destination,
            output = %output.trim(),
            "Backup completed successfully"
        );
        Ok(())
    }
}

pub fn remote_path(destination: &str) -> String {
    format!("{REMOTE_NAME}:{destination}")
}
