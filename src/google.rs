use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ABOUT_URL: &str = "https://www.googleapis.com/drive/v3/about";
const STATE: &str = "state-token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_DELTA_SECS: i64 = 10;

/// OAuth client from a Google Cloud `credentials.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

impl ClientCredentials {
    pub fn from_json(data: &str) -> Result<Self> {
        let file: CredentialsFile = serde_json::from_str(data)?;
        match file.installed.or(file.web) {
            Some(creds) => Ok(creds),
            None => bail!("expected an \"installed\" or \"web\" client"),
        }
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris.first().map(String::as_str).unwrap_or("")
    }

    /// Consent page URL requesting offline Drive access.
    pub fn auth_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.auth_uri)
            .with_context(|| format!("invalid auth_uri: {}", self.auth_uri))?;
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri())
            .append_pair("response_type", "code")
            .append_pair("scope", DRIVE_SCOPE)
            .append_pair("state", STATE);
        Ok(url)
    }
}

/// Token as persisted in `token.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// Tokens that never expire carry the zero time `0001-01-01T00:00:00Z`.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|t| t.year() > 1))
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_DELTA_SECS) <= now,
            None => false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: String,
}

#[derive(Deserialize)]
struct About {
    user: DriveUser,
}

/// Extracts the authorization code from the redirect URL the browser landed on.
pub fn parse_redirect_url(redirect: &str) -> Result<String> {
    let url = Url::parse(redirect.trim()).context("failed to parse redirect URL")?;
    match url.query_pairs().find(|(k, _)| k == "code") {
        Some((_, code)) if !code.is_empty() => Ok(code.into_owned()),
        _ => bail!("authorization code not found in redirect URL"),
    }
}

/// `credentials.json` and `token.json` under one directory.
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join("credentials.json")
    }

    pub fn token_path(&self) -> PathBuf {
        self.dir.join("token.json")
    }

    pub fn load_credentials(&self) -> Result<ClientCredentials> {
        let path = self.credentials_path();
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read credentials file {}", path.display()))?;
        ClientCredentials::from_json(&data)
            .with_context(|| format!("failed to decode credentials file {}", path.display()))
    }

    pub fn load_token(&self) -> Result<Token> {
        let path = self.token_path();
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read token file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to decode token file {}", path.display()))
    }

    /// `token.json` as compact single-line JSON for the rclone config.
    ///
    /// Works on the raw document so fields `Token` does not model survive.
    pub fn load_token_json(&self) -> Result<String> {
        let path = self.token_path();
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read token file {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&data)
            .with_context(|| format!("failed to decode token file {}", path.display()))?;
        if !value.is_object() {
            bail!("token file {} is not a JSON object", path.display());
        }
        Ok(value.to_string())
    }

    pub fn save_token(&self, token: &Token) -> Result<PathBuf> {
        let path = self.token_path();
        write_private(&path, token.to_json()?.as_bytes())
            .with_context(|| format!("unable to save token to {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o660)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)
}

/// Blocking client for the OAuth token endpoint and the Drive API.
pub struct GoogleClient {
    http: reqwest::blocking::Client,
    creds: ClientCredentials,
}

impl GoogleClient {
    pub fn new(creds: ClientCredentials) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("drive-backup/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, creds })
    }

    pub fn exchange_code(&self, code: &str) -> Result<Token> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.creds.redirect_uri()),
        ])
        .context("unable to exchange authorization code")
    }

    /// New access token from the refresh token. Google omits the refresh
    /// token in the response, so the old one is carried over.
    pub fn refresh(&self, token: &Token) -> Result<Token> {
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            bail!("token expired and has no refresh_token; run `auth` again");
        };
        let mut fresh = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .context("unable to refresh token")?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = Some(refresh_token.to_string());
        }
        Ok(fresh)
    }

    fn request_token(&self, params: &[(&str, &str)]) -> Result<Token> {
        let mut form = vec![
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
        ];
        form.extend_from_slice(params);

        let resp = self.http.post(&self.creds.token_uri).form(&form).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("token endpoint returned {status}: {}", body.trim());
        }
        let body: TokenResponse = resp.json()?;
        Ok(body.into_token(Utc::now()))
    }

    pub fn about_user(&self, token: &Token) -> Result<DriveUser> {
        let resp = self
            .http
            .get(ABOUT_URL)
            .query(&[("fields", "user")])
            .bearer_auth(&token.access_token)
            .send()
            .context("unable to reach Drive API")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("Drive API returned {status}: {}", body.trim());
        }
        let about: About = resp.json().context("unable to decode about info")?;
        Ok(about.user)
    }
}
