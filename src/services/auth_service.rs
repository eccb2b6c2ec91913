use crate::adapters::storage::SecureStore;
use crate::api::schemas::auth::{PasswordGrant, RefreshGrant, TokenResponse};
use crate::config::AuthConfig;
use crate::domain::auth::{AuthToken, TOKEN_STORAGE_KEY};
use crate::error::{AppError, Result};
use opentelemetry::{global, metrics::Counter};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    refresh_total: Counter<u64>,
    refresh_failed_total: Counter<u64>,
    logout_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("forms-client");
        Self {
            login_total: meter
                .u64_counter("auth_login_total")
                .with_description("Total number of successful password logins")
                .build(),
            refresh_total: meter
                .u64_counter("auth_refresh_total")
                .with_description("Total number of successful token refreshes")
                .build(),
            refresh_failed_total: meter
                .u64_counter("auth_refresh_failed_total")
                .with_description("Total number of refresh attempts that ended the session")
                .build(),
            logout_total: meter
                .u64_counter("auth_logout_total")
                .with_description("Total number of sessions cleared")
                .build(),
        }
    }
}

/// Owns the current session.
///
/// The session sits behind an async mutex that is held across refreshes, so
/// concurrent callers never race two refresh grants against each other.
#[derive(Debug)]
pub struct AuthService {
    http: Client,
    token_url: Url,
    config: AuthConfig,
    store: Arc<dyn SecureStore>,
    session: Mutex<Option<AuthToken>>,
    metrics: Metrics,
}

impl AuthService {
    /// # Errors
    /// Returns `AppError::InvalidUrl` if the token path cannot be joined onto the base URL.
    pub fn new(http: Client, base_url: &Url, config: AuthConfig, store: Arc<dyn SecureStore>) -> Result<Self> {
        let token_url = base_url.join(&config.token_path)?;
        Ok(Self { http, token_url, config, store, session: Mutex::new(None), metrics: Metrics::new() })
    }

    /// Exchanges credentials for a token and persists it.
    ///
    /// # Errors
    /// Returns `AppError::AuthenticationFailed` if the credentials are rejected, or a
    /// transport/storage error otherwise.
    #[tracing::instrument(skip(self, username, password), err(level = "warn"))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken> {
        let mut session = self.session.lock().await;
        let grant = PasswordGrant::new(username, password, &self.config.scope, self.config.client_id.as_deref());
        let token = self.request_token(&grant).await?;

        self.persist(&token).await?;
        *session = Some(token.clone());

        tracing::info!(expires_at = %token.expires_at, "Logged in");
        self.metrics.login_total.add(1, &[]);
        Ok(token)
    }

    /// Loads a persisted session into memory.
    ///
    /// Returns whether a session was found. Unreadable entries are discarded.
    ///
    /// # Errors
    /// Returns an error if the secure store cannot be read.
    #[tracing::instrument(err, skip(self))]
    pub async fn restore_session(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        *session = self.read_persisted().await?;
        Ok(session.is_some())
    }

    /// Returns `true` if a usable token is present, refreshing it once if it has expired.
    ///
    /// A failed refresh clears the session and returns `false`.
    pub async fn ensure_valid_token(&self) -> bool {
        self.valid_token().await.is_some()
    }

    /// Like [`Self::ensure_valid_token`], handing back the token that passed the gate.
    #[tracing::instrument(skip(self))]
    pub async fn valid_token(&self) -> Option<AuthToken> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            match self.read_persisted().await {
                Ok(restored) => *session = restored,
                Err(e) => tracing::warn!(error = %e, "Could not read persisted session"),
            }
        }

        match session.as_ref() {
            None => {
                tracing::debug!("No session");
                return None;
            }
            Some(token) if !token.is_expired() => return Some(token.clone()),
            Some(_) => tracing::debug!("Access token expired, refreshing"),
        }

        self.refresh_or_clear(&mut session).await
    }

    /// Refreshes the session after the server rejected `rejected_access_token`.
    ///
    /// If the session already moved on to a different, unexpired token it is returned
    /// without another refresh.
    #[tracing::instrument(skip_all)]
    pub async fn refresh_after_rejection(&self, rejected_access_token: &str) -> Option<AuthToken> {
        let mut session = self.session.lock().await;
        match session.as_ref() {
            Some(token) if token.access_token != rejected_access_token && !token.is_expired() => {
                tracing::debug!("Session already refreshed by another request");
                return Some(token.clone());
            }
            Some(_) => {}
            None => return None,
        }
        self.refresh_or_clear(&mut session).await
    }

    /// Forces a refresh of the current session.
    ///
    /// # Errors
    /// Returns `AppError::AuthenticationFailed` if there is no refresh token or the grant
    /// is rejected; the session is cleared in every failure case.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn refresh(&self) -> Result<AuthToken> {
        let mut session = self.session.lock().await;
        match self.refresh_locked(&mut session).await {
            Ok(token) => Ok(token),
            Err(e) => {
                self.metrics.refresh_failed_total.add(1, &[]);
                self.clear_locked(&mut session).await;
                Err(e)
            }
        }
    }

    /// Clears the session from memory and from the secure store.
    ///
    /// # Errors
    /// Returns an error if the persisted session cannot be removed.
    #[tracing::instrument(err, skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        *session = None;
        self.store.remove(TOKEN_STORAGE_KEY).await?;
        self.metrics.logout_total.add(1, &[]);
        tracing::info!("Logged out");
        Ok(())
    }

    pub async fn current_token(&self) -> Option<AuthToken> {
        self.session.lock().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.as_ref().is_some_and(|t| !t.is_expired())
    }

    async fn refresh_or_clear(&self, session: &mut Option<AuthToken>) -> Option<AuthToken> {
        match self.refresh_locked(session).await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing session");
                self.metrics.refresh_failed_total.add(1, &[]);
                self.clear_locked(session).await;
                None
            }
        }
    }

    async fn refresh_locked(&self, session: &mut Option<AuthToken>) -> Result<AuthToken> {
        let refresh_token = session
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or(AppError::AuthenticationFailed)?;

        let grant = RefreshGrant::new(&refresh_token, self.config.client_id.as_deref());
        let token = self.request_token(&grant).await?.or_refresh_token(Some(&refresh_token));

        *session = Some(token.clone());
        if let Err(e) = self.persist(&token).await {
            tracing::warn!(error = %e, "Refreshed token could not be persisted");
        }

        tracing::info!(expires_at = %token.expires_at, "Token refreshed");
        self.metrics.refresh_total.add(1, &[]);
        Ok(token)
    }

    async fn clear_locked(&self, session: &mut Option<AuthToken>) {
        *session = None;
        if let Err(e) = self.store.remove(TOKEN_STORAGE_KEY).await {
            tracing::warn!(error = %e, "Could not remove persisted session");
        }
        self.metrics.logout_total.add(1, &[]);
    }

    async fn request_token<F: Serialize + Sync>(&self, grant: &F) -> Result<AuthToken> {
        let issued_at = OffsetDateTime::now_utc();
        let response = self.http.post(self.token_url.clone()).form(grant).send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            let parsed: TokenResponse = serde_json::from_slice(&body).map_err(AppError::Decode)?;
            return Ok(parsed.into_token(issued_at));
        }

        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            tracing::debug!(status = %status, "Token grant rejected");
            return Err(AppError::AuthenticationFailed);
        }
        Err(AppError::from_response_body(status, &body))
    }

    async fn persist(&self, token: &AuthToken) -> Result<()> {
        let json = serde_json::to_string(token).map_err(AppError::Serialization)?;
        self.store.set(TOKEN_STORAGE_KEY, &json).await
    }

    async fn read_persisted(&self) -> Result<Option<AuthToken>> {
        let Some(raw) = self.store.get(TOKEN_STORAGE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                self.store.remove(TOKEN_STORAGE_KEY).await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemorySecureStore;
    use time::Duration;

    // Nothing listens here; any network call fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9/";

    fn setup_service(store: Arc<dyn SecureStore>) -> AuthService {
        let base = Url::parse(UNREACHABLE).unwrap();
        let http = Client::builder().timeout(std::time::Duration::from_secs(2)).build().unwrap();
        AuthService::new(http, &base, AuthConfig::default(), store).unwrap()
    }

    fn token(expires_in: i64, refresh: Option<&str>) -> AuthToken {
        AuthToken {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: OffsetDateTime::now_utc() + Duration::seconds(expires_in),
        }
    }

    async fn seed(store: &MemorySecureStore, token: &AuthToken) {
        store.set(TOKEN_STORAGE_KEY, &serde_json::to_string(token).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_valid_token_needs_no_network() {
        let store = Arc::new(MemorySecureStore::new());
        seed(&store, &token(3600, Some("refresh"))).await;
        let service = setup_service(store);

        assert!(service.ensure_valid_token().await);
        assert!(service.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session() {
        let store = Arc::new(MemorySecureStore::new());
        seed(&store, &token(-60, Some("refresh"))).await;
        let service = setup_service(store.clone());

        assert!(!service.ensure_valid_token().await);
        assert!(service.current_token().await.is_none());
        assert!(store.get(TOKEN_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_clears_session() {
        let store = Arc::new(MemorySecureStore::new());
        seed(&store, &token(-60, None)).await;
        let service = setup_service(store.clone());

        assert!(!service.ensure_valid_token().await);
        assert!(store.get(TOKEN_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_session_is_not_authenticated() {
        let service = setup_service(Arc::new(MemorySecureStore::new()));
        assert!(!service.ensure_valid_token().await);
        assert!(!service.restore_session().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_persisted_session_is_discarded() {
        let store = Arc::new(MemorySecureStore::new());
        store.set(TOKEN_STORAGE_KEY, "not json").await.unwrap();
        let service = setup_service(store.clone());

        assert!(!service.restore_session().await.unwrap());
        assert!(store.get(TOKEN_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_skips_refresh_when_already_rotated() {
        let store = Arc::new(MemorySecureStore::new());
        seed(&store, &token(3600, Some("refresh"))).await;
        let service = setup_service(store);
        assert!(service.restore_session().await.unwrap());

        let current = service.refresh_after_rejection("some-older-token").await.unwrap();
        assert_eq!(current.access_token, "access");
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let store = Arc::new(MemorySecureStore::new());
        seed(&store, &token(3600, Some("refresh"))).await;
        let service = setup_service(store.clone());
        assert!(service.restore_session().await.unwrap());

        service.logout().await.unwrap();
        service.logout().await.unwrap();
        assert!(service.current_token().await.is_none());
        assert!(store.get(TOKEN_STORAGE_KEY).await.unwrap().is_none());
    }
}
