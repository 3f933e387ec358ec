//! Google sign-in (authorization-code flow).

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize};

use crate::config::GoogleConfig;

pub const STATE_COOKIE: &str = "oauth_state";

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// What the provider vouches for once the code exchange succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser; `state` comes back on the callback.
    fn authorize_url(&self, state: &str) -> Result<Url>;
    /// Trades the callback code for a verified email.
    async fn exchange(&self, code: &str) -> Result<VerifiedIdentity>;
}

/// Random CSRF value for one round trip through the provider.
pub fn new_state() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

#[derive(Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    cfg: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(cfg: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cfg,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("google error ({}): {}", status, body);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> Result<Url> {
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.cfg.client_id.as_str()),
                ("redirect_uri", self.cfg.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .context("build google authorize url")
    }

    async fn exchange(&self, code: &str) -> Result<VerifiedIdentity> {
        let token: TokenResponse = self
            .send_json(self.http.post(TOKEN_URL).form(&[
                ("code", code),
                ("client_id", self.cfg.client_id.as_str()),
                ("client_secret", self.cfg.client_secret.as_str()),
                ("redirect_uri", self.cfg.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ]))
            .await
            .context("exchange authorization code")?;

        let info: UserInfo = self
            .send_json(self.http.get(USERINFO_URL).bearer_auth(&token.access_token))
            .await
            .context("fetch userinfo")?;

        let email = info
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .context("email not found")?;
        anyhow::ensure!(info.email_verified.unwrap_or(false), "email not verified");
        Ok(VerifiedIdentity { email })
    }
}
