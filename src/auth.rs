//! OAuth access tokens, one token file per account.
//!
//! Order of attempts for an account:
//! 1. reuse the stored token while it has not expired
//! 2. refresh it once with the stored refresh token
//! 3. run the authorization-code flow with a local callback listener
//!
//! A failed refresh falls through to step 3; nothing is retried.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::config::AccountCredentials;
use crate::error::{AtlasError, Result};

pub const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
pub const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
pub const DEFAULT_CALLBACK_PORT: u16 = 8000;
const SCOPE: &str = "activity:read_all";

// ============================================================================
// Token file
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// Token endpoint response, stored as-is in `strava_token_{account}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete: Option<Athlete>,
    /// Any other fields of the response, kept so the file round-trips
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenSet {
    /// Token file path for `account` inside `dir`.
    pub fn path_for(dir: &Path, account: &str) -> PathBuf {
        dir.join(format!("strava_token_{}.json", account))
    }

    /// Read a token file; `Ok(None)` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// True while the access token is usable at `now` (Unix seconds).
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.access_token.is_empty() && self.expires_at.is_some_and(|t| t > now)
    }

    /// `"First Last (id=123)"` for log lines.
    pub fn athlete_label(&self) -> String {
        let athlete = self.athlete.clone().unwrap_or_default();
        format!(
            "{} {} (id={})",
            athlete.firstname.as_deref().unwrap_or("?"),
            athlete.lastname.as_deref().unwrap_or("?"),
            athlete
                .id
                .map_or_else(|| "?".to_string(), |id| id.to_string())
        )
    }
}

// ============================================================================
// Authenticator
// ============================================================================

/// Produces access tokens for configured accounts.
pub struct Authenticator {
    client: Client,
    token_dir: PathBuf,
    callback_port: u16,
}

impl Authenticator {
    pub fn new(token_dir: impl Into<PathBuf>, callback_port: u16) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            token_dir: token_dir.into(),
            callback_port,
        })
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.callback_port)
    }

    /// Browser URL that starts the authorization-code flow.
    pub fn authorize_url(&self, client_id: &str) -> Result<Url> {
        let redirect = self.redirect_uri();
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", redirect.as_str()),
                ("scope", SCOPE),
            ],
        )
        .map_err(|e| AtlasError::Config {
            message: format!("Invalid authorize URL: {}", e),
        })
    }

    /// Access token for one account (reuse, refresh once, or full flow).
    pub async fn access_token(&self, creds: &AccountCredentials) -> Result<String> {
        let path = TokenSet::path_for(&self.token_dir, &creds.name);

        if let Some(stored) = TokenSet::load(&path)? {
            if stored.is_valid_at(Utc::now().timestamp()) {
                info!("[Auth] {}: reusing token for {}", creds.name, stored.athlete_label());
                return Ok(stored.access_token);
            }

            if let Some(refresh_token) = stored.refresh_token.as_deref() {
                info!("[Auth] {}: access token expired, refreshing", creds.name);
                match self.refresh(creds, refresh_token).await {
                    Ok(token) => {
                        token.save(&path)?;
                        info!("[Auth] {}: refreshed token for {}", creds.name, token.athlete_label());
                        return Ok(token.access_token);
                    }
                    Err(e) => warn!(
                        "[Auth] {}: refresh failed ({}), starting full authorization",
                        creds.name, e
                    ),
                }
            }
        }

        let token = self.authorize(creds).await?;
        token.save(&path)?;
        info!("[Auth] {}: authorized as {}", creds.name, token.athlete_label());
        Ok(token.access_token)
    }

    async fn refresh(&self, creds: &AccountCredentials, refresh_token: &str) -> Result<TokenSet> {
        self.exchange(
            creds,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
        )
        .await
    }

    async fn authorize(&self, creds: &AccountCredentials) -> Result<TokenSet> {
        let url = self.authorize_url(&creds.client_id)?;
        let listener = TcpListener::bind(("127.0.0.1", self.callback_port))
            .await
            .map_err(|e| auth_error(creds, format!("cannot listen on port {}: {}", self.callback_port, e)))?;

        info!(
            "[Auth] {}: log in with the right Strava account and open\n\n    {}\n",
            creds.name, url
        );
        info!("[Auth] {}: waiting for authorization...", creds.name);

        let code = wait_for_code(&listener)
            .await
            .map_err(|e| auth_error(creds, e.to_string()))?;

        self.exchange(
            creds,
            &[("grant_type", "authorization_code"), ("code", code.as_str())],
        )
        .await
    }

    async fn exchange(&self, creds: &AccountCredentials, grant: &[(&str, &str)]) -> Result<TokenSet> {
        let mut form = vec![
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self.client.post(TOKEN_URL).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(
                creds,
                format!("token endpoint returned {}: {}", status.as_u16(), body),
            ));
        }
        Ok(response.json::<TokenSet>().await?)
    }
}

fn auth_error(creds: &AccountCredentials, message: String) -> AtlasError {
    AtlasError::Auth {
        account: creds.name.clone(),
        message,
    }
}

// ============================================================================
// Callback listener
// ============================================================================

const SUCCESS_PAGE: &str =
    "<html><body><h1>Authorization successful! You can close this window.</h1></body></html>";
const FAILURE_PAGE: &str = "<html><body><h1>Authorization failed!</h1></body></html>";

/// `code` query parameter of an HTTP request line (`GET /callback?code=.. HTTP/1.1`).
fn code_from_request(request: &str) -> Option<String> {
    let target = request.lines().next()?.split_whitespace().nth(1)?;
    let url = Url::parse("http://localhost").ok()?.join(target).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Accept callback requests until one carries a code.
async fn wait_for_code(listener: &TcpListener) -> std::io::Result<String> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);
        let code = code_from_request(&request);

        let (status, page) = match code {
            Some(_) => ("200 OK", SUCCESS_PAGE),
            None => ("400 Bad Request", FAILURE_PAGE),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            page.len(),
            page
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await.ok();

        match code {
            Some(code) => return Ok(code),
            None => warn!("[Auth] Callback from {} without code, still waiting", peer),
        }
    }
}
