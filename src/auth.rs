//! Session cookies, current-user extractors, the ownership gate, and the
//! Google identity provider.

use crate::domain::{IdentityClaims, IdentityProvider};
use crate::errors::{AppError, AuthError};
use crate::models::{Soundboard, User};
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header;
use axum::http::request::Parts;
use serde::Deserialize;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "sid";

/// Pulls the session token out of the Cookie header, if any.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("sid="))
        .map(str::to_string)
}

fn resolve_session(parts: &Parts, state: &AppState) -> Option<User> {
    let token = session_token_from_headers(&parts.headers)?;
    state.sessions.get(&token).map(|entry| entry.value().clone())
}

/// Extractor for routes that require a logged-in user. Rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user = resolve_session(parts, state);
        async move { user.map(CurrentUser).ok_or(AppError::Unauthenticated) }
    }
}

/// Extractor for routes that merely want to know who is asking, if anyone.
/// Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalCurrentUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for OptionalCurrentUser {
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user = resolve_session(parts, state);
        async move { Ok(OptionalCurrentUser(user)) }
    }
}

/// Authorization gate for mutating routes: only the board's creator may
/// edit or delete it. Composed ahead of the reconciliation call.
pub fn ensure_owner(user: &User, board: &Soundboard) -> Result<(), AppError> {
    if board.creator == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

// --- Google identity provider ---

const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

pub struct GoogleIdentityProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_url,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self) -> String {
        // Infallible for a constant base URL with query pairs.
        reqwest::Url::parse_with_params(
            AUTHORIZE_ENDPOINT,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", "openid profile email"),
            ],
        )
        .map(String::from)
        .unwrap_or_else(|_| AUTHORIZE_ENDPOINT.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityClaims, AuthError> {
        let resp = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                AuthError::BackendError(anyhow::Error::new(e).context("Token exchange request failed"))
            })?;

        if !resp.status().is_success() {
            return Err(AuthError::ExchangeFailed(format!(
                "token endpoint returned {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp.json().await.map_err(|e| {
            AuthError::BackendError(anyhow::Error::new(e).context("Invalid token response body"))
        })?;

        let resp = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| {
                AuthError::BackendError(anyhow::Error::new(e).context("Userinfo request failed"))
            })?;

        if !resp.status().is_success() {
            return Err(AuthError::ExchangeFailed(format!(
                "userinfo endpoint returned {}",
                resp.status()
            )));
        }

        let info: UserInfo = resp.json().await.map_err(|e| {
            AuthError::BackendError(anyhow::Error::new(e).context("Invalid userinfo response body"))
        })?;

        let display_name = info
            .name
            .or(info.email)
            .unwrap_or_else(|| info.sub.clone());

        Ok(IdentityClaims {
            external_id: info.sub,
            display_name,
        })
    }
}
