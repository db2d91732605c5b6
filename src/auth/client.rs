//! Auth sub-client — login, logout, session validation, explicit refresh.

use reqwest::Method;
use serde_json::Value;

use crate::auth::{parse_refresh_response, LoginRequest, MeResponse, UserProfile};
use crate::client::CohortlyClient;
use crate::error::{AuthError, HttpError, SdkError};
use crate::http::RecoveryPolicy;
use crate::session::Session;

/// Sub-client for authentication operations.
pub struct Auth<'a> {
    pub(crate) client: &'a CohortlyClient,
}

impl Auth<'_> {
    /// Log in with email and password, persist the returned session, and
    /// return the user profile.
    ///
    /// Runs with recovery disabled: a 401 here means bad credentials, not an
    /// expired token, and a fallback hop would just fail the same way with a
    /// worse error.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, SdkError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let payload: Value = self
            .client
            .http
            .request_value(Method::POST, "/auth/login", Some(&request), RecoveryPolicy::none())
            .await
            .map_err(|e| match e {
                HttpError::Unauthorized => {
                    SdkError::Auth(AuthError::LoginFailed("invalid credentials".into()))
                }
                other => SdkError::Http(other),
            })?;

        let tokens = parse_refresh_response(&payload).ok_or_else(|| {
            SdkError::Auth(AuthError::LoginFailed(
                "login response carried no session".into(),
            ))
        })?;

        let session = Session {
            expires_at: tokens
                .expires_at
                .or_else(|| crate::session::jwt::expiry(&tokens.access_token)),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        };
        self.client.http.store_session(session);

        let user = payload
            .get("user")
            .cloned()
            .ok_or_else(|| SdkError::Auth(AuthError::LoginFailed("login response carried no user".into())))?;
        Ok(serde_json::from_value(user)?)
    }

    /// Validate the current session against the server and return the
    /// profile. A terminal 401 clears the stored session on the way out.
    pub async fn me(&self) -> Result<UserProfile, SdkError> {
        let me: MeResponse = self.client.http.get("/auth/me").await?;
        Ok(me.user)
    }

    /// Force a refresh exchange now. Shares the single-flight gate with the
    /// automatic paths.
    pub async fn refresh(&self) -> Result<Session, SdkError> {
        let session = self
            .client
            .http
            .session()
            .ok_or(AuthError::NotAuthenticated)?;
        if session.refresh_token.is_none() {
            return Err(AuthError::NoRefreshToken.into());
        }
        Ok(self
            .client
            .http
            .refresh_session(Some(&session.access_token))
            .await?)
    }

    /// Log out: best-effort server-side revocation, then drop the local
    /// session and every cached response.
    pub async fn logout(&self) -> Result<(), SdkError> {
        let _ = self
            .client
            .http
            .request_value(
                Method::POST,
                "/auth/logout",
                Some(&serde_json::json!({})),
                RecoveryPolicy::none(),
            )
            .await;

        self.client.http.clear_session();
        self.client.cache.clear().await;
        Ok(())
    }

    /// Whether a session exists and has not visibly expired. Purely local —
    /// use `me()` for a server-validated check.
    pub fn is_authenticated(&self) -> bool {
        self.client
            .http
            .session()
            .map(|s| s.expiry().map_or(true, |at| at > chrono::Utc::now()))
            .unwrap_or(false)
    }
}
