use crate::target::BackupItem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid backup targets: {0}")]
    InvalidConfig(String),

    #[error("failed to write rclone config: {0}")]
    ConfigWrite(#[source] std::io::Error),

    #[error("backup of {} -> {} failed", .item.source, .item.destination)]
    BackupFailed {
        item: BackupItem,
        #[source]
        source: TransferError,
    },
}

/// Failure of a single external sync invocation. `output` is the combined
/// stdout/stderr, kept for diagnostics only.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to execute {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {}", exit_code(.code), .output.trim())]
    Exit {
        program: String,
        code: Option<i32>,
        output: String,
    },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_error_shows_status_and_output() {
        let err = TransferError::Exit {
            program: "rclone".into(),
            code: Some(3),
            output: "directory not found\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "rclone exited with status 3: directory not found"
        );
    }

    #[test]
    fn backup_failed_names_item_and_keeps_cause() {
        let err = BackupError::BackupFailed {
            item: BackupItem {
                source: "/a".into(),
                destination: "x/y".into(),
            },
            source: TransferError::Exit {
                program: "rclone".into(),
                code: None,
                output: String::new(),
            },
        };
        assert_eq!(err.to_string(), "backup of /a -> x/y failed");
        let cause = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("rclone exited with signal: "));
    }
}
