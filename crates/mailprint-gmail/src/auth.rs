//! Google `OAuth2` access-token management.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Result;
use crate::token::{ErrorResponse, Token, TokenResponse};

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Hands out valid access tokens, refreshing them when they expire.
#[derive(Debug)]
pub struct GoogleAuth {
    client_id: String,
    client_secret: Option<String>,
    token_url: String,
    cache_path: Option<PathBuf>,
    token: Mutex<Token>,
    refresh_timeout: Duration,
    http_client: Client,
}

impl GoogleAuth {
    /// Creates an authenticator from a refresh token.
    #[must_use]
    pub fn new(client_id: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self::with_token(client_id, Token::from_refresh_token(refresh_token))
    }

    /// Creates an authenticator from an existing token.
    #[must_use]
    pub fn with_token(client_id: impl Into<String>, token: Token) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            cache_path: None,
            token: Mutex::new(token),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            http_client: Client::new(),
        }
    }

    /// Builds an authenticator from the token cache, falling back to `refresh_token`.
    ///
    /// An explicit `refresh_token` replaces the cached one.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoRefreshToken` if neither source has a refresh token.
    /// An unreadable cache is logged and ignored.
    pub async fn from_cache(
        client_id: impl Into<String>,
        refresh_token: Option<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let cache_path = cache_path.into();
        let cached = match Token::load(&cache_path).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {e}", cache_path.display());
                None
            }
        };

        let token = match (cached, refresh_token) {
            (Some(mut token), Some(refresh)) => {
                if token.refresh_token.as_deref() != Some(refresh.as_str()) {
                    token = Token::from_refresh_token(refresh);
                }
                token
            }
            (Some(token), None) => token,
            (None, Some(refresh)) => Token::from_refresh_token(refresh),
            (None, None) => return Err(crate::Error::NoRefreshToken),
        };
        token.refresh_token()?;

        let mut auth = Self::with_token(client_id, token);
        auth.cache_path = Some(cache_path);
        Ok(auth)
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the timeout for token refresh requests.
    #[must_use]
    pub const fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Returns a valid access token, refreshing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a refresh is needed and fails.
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            info!("Refreshing Gmail API credentials");
            let fresh = self.refresh(&token).await?;
            if let Some(path) = &self.cache_path {
                if let Err(e) = fresh.save(path).await {
                    warn!("Failed to cache access token: {e}");
                }
            }
            *token = fresh;
        }
        Ok(token.access_token.clone())
    }

    /// Refreshes an access token using a refresh token.
    async fn refresh(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .timeout(self.refresh_timeout)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        let mut new_token = Token::from_response(token_response);

        // Google omits the refresh token on refresh responses
        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }

        Ok(new_token)
    }
}
