//! Service-account authentication for the Google Sheets API.
//!
//! A signed RS256 JWT is exchanged for an access token using the JWT bearer grant. The token is
//! reused until shortly before it expires.

use crate::api::SHEETS_SCOPE;
use crate::clock::Clock;
use crate::config::Credentials;
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion. Google caps this at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A token is refreshed once it is this close to expiring.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Claims of the assertion sent to the token endpoint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Hands out access tokens for a service account, refreshing them as needed.
pub(crate) struct TokenProvider {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    http: reqwest::Client,
    token: Option<AccessToken>,
}

impl TokenProvider {
    pub(crate) fn new(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials,
            clock,
            http: reqwest::Client::new(),
            token: None,
        }
    }

    /// Returns a valid access token. A new one is requested when there is none or it is about to
    /// expire.
    pub(crate) async fn token(&mut self) -> Result<String> {
        let now = self.clock.now();
        if let Some(token) = &self.token {
            if is_fresh(token, now) {
                return Ok(token.value.clone());
            }
        }
        debug!("Requesting a new access token for {}", self.credentials.client_email());
        let token = self.request_token(now).await?;
        let value = token.value.clone();
        self.token = Some(token);
        Ok(value)
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let assertion = sign_assertion(&self.credentials, now)?;
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Failed to send the token request to Google")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Google token request failed with status {status}: {body}");
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse the Google token response")?;
        Ok(AccessToken {
            value: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }
}

fn is_fresh(token: &AccessToken, now: DateTime<Utc>) -> bool {
    now + Duration::seconds(EXPIRY_MARGIN_SECS) < token.expires_at
}

fn claims(credentials: &Credentials, now: DateTime<Utc>) -> Claims {
    let iat = now.timestamp();
    Claims {
        iss: credentials.client_email().to_string(),
        scope: SHEETS_SCOPE.to_string(),
        aud: TOKEN_URL.to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    }
}

fn sign_assertion(credentials: &Credentials, now: DateTime<Utc>) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key().as_bytes())
        .context("GOOGLE_PRIVATE_KEY is not a valid PEM-encoded RSA private key")?;
    encode(&Header::new(Algorithm::RS256), &claims(credentials, now), &key)
        .context("Unable to sign the service account assertion")
}
