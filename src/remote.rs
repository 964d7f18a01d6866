use crate::google::ClientCredentials;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Name of the rclone remote every backup writes to.
pub const REMOTE_NAME: &str = "gdrive";

const TEMPLATE: &str = "\
[#remote#]
type = drive
client_id = #client_id#
client_secret = #client_secret#
scope = drive
token = #token#
team_drive =
";

/// rclone config for a single backup run.
///
/// Each instance owns its own temp file, so concurrent runs never share a
/// config. The file is removed when the value is dropped.
#[derive(Debug)]
pub struct RemoteConfig {
    file: NamedTempFile,
}

impl RemoteConfig {
    pub fn materialize(creds: &ClientCredentials, token: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("rclone-")
            .suffix(".conf")
            .tempfile()?;
        file.write_all(render(REMOTE_NAME, creds, token).as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

pub fn render(remote: &str, creds: &ClientCredentials, token: &str) -> String {
    TEMPLATE
        .replace("#remote#", remote)
        .replace("#client_id#", &creds.client_id)
        .replace("#client_secret#", &creds.client_secret)
        .replace("#token#", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> ClientCredentials {
        ClientCredentials {
            client_id: "id-123.apps.googleusercontent.com".into(),
            client_secret: "s3cret".into(),
            ..ClientCredentials::default()
        }
    }

    #[test]
    fn renders_drive_remote() {
        let out = render("gdrive", &creds(), r#"{"access_token":"ya29"}"#);
        assert_eq!(
            out,
            "[gdrive]\n\
             type = drive\n\
             client_id = id-123.apps.googleusercontent.com\n\
             client_secret = s3cret\n\
             scope = drive\n\
             token = {\"access_token\":\"ya29\"}\n\
             team_drive =\n"
        );
    }

    #[test]
    fn writes_config_to_unique_temp_files() {
        let a = RemoteConfig::materialize(&creds(), "tok").unwrap();
        let b = RemoteConfig::materialize(&creds(), "tok").unwrap();
        assert_ne!(a.path(), b.path());

        let content = std::fs::read_to_string(a.path()).unwrap();
        assert!(content.starts_with("[gdrive]\n"));
        assert!(content.contains("token = tok\n"));
    }

    #[test]
    fn removes_file_on_drop() {
        let config = RemoteConfig::materialize(&creds(), "tok").unwrap();
        let path = config.path().to_path_buf();
        assert!(path.exists());
        drop(config);
        assert!(!path.exists());
    }
}
