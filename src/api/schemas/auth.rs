use crate::domain::auth::AuthToken;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, Time};

/// Form body of a `password` grant against the token endpoint.
#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub grant_type: &'static str,
    pub username: &'a str,
    pub password: &'a str,
    pub scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<&'a str>,
}

impl<'a> PasswordGrant<'a> {
    #[must_use]
    pub const fn new(username: &'a str, password: &'a str, scope: &'a str, client_id: Option<&'a str>) -> Self {
        Self { grant_type: "password", username, password, scope, client_id }
    }
}

/// Form body of a `refresh_token` grant against the token endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshGrant<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<&'a str>,
}

impl<'a> RefreshGrant<'a> {
    #[must_use]
    pub const fn new(refresh_token: &'a str, client_id: Option<&'a str>) -> Self {
        Self { grant_type: "refresh_token", refresh_token, client_id }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Converts the response into a session token whose expiry is anchored at `issued_at`.
    ///
    /// Lifetimes beyond the representable range saturate: far-future ones to the
    /// last representable day, negative ones to `issued_at` (already expired).
    #[must_use]
    pub fn into_token(self, issued_at: OffsetDateTime) -> AuthToken {
        let expires_at = issued_at.checked_add(Duration::seconds(self.expires_in)).unwrap_or_else(|| {
            if self.expires_in > 0 { Date::MAX.with_time(Time::MIDNIGHT).assume_utc() } else { issued_at }
        });
        AuthToken { access_token: self.access_token, token_type: self.token_type, refresh_token: self.refresh_token, expires_at }
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}
