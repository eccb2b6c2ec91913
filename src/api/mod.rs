use crate::error::{AppError, Result};
use crate::services::auth_service::AuthService;
use opentelemetry::{global, metrics::Counter};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub mod schemas;

#[derive(Clone, Debug)]
struct Metrics {
    unauthorized_retry_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("forms-client");
        Self {
            unauthorized_retry_total: meter
                .u64_counter("api_unauthorized_retry_total")
                .with_description("Total number of requests re-issued after a 401")
                .build(),
        }
    }
}

/// Authenticated transport shared by the resource services.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    auth: Arc<AuthService>,
    metrics: Metrics,
}

impl ApiClient {
    #[must_use]
    pub fn new(http: Client, base_url: Url, auth: Arc<AuthService>) -> Self {
        Self { http, base_url, auth, metrics: Metrics::new() }
    }

    /// Resolves a path relative to the configured base URL.
    ///
    /// # Errors
    /// Returns `AppError::InvalidUrl` if the path does not form a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Sends a request with the session's bearer token.
    ///
    /// A 401 triggers exactly one refresh and one re-issue of the request; a second
    /// 401 ends the session. Non-success statuses are mapped to `AppError`.
    ///
    /// # Errors
    /// `AuthenticationRequired` when there is no usable session (nothing is sent),
    /// `AuthenticationFailed` when the server keeps rejecting the session, otherwise
    /// transport or API errors.
    #[tracing::instrument(err(level = "debug"), skip(self, customize, url), fields(url = %url))]
    pub async fn send_authorized<F>(&self, method: Method, url: Url, customize: F) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let Some(token) = self.auth.valid_token().await else {
            return Err(AppError::AuthenticationRequired);
        };

        let response = self.dispatch(&method, &url, &token.authorization(), &customize).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return error_for_status(response).await;
        }

        tracing::warn!("Request rejected with 401, refreshing session and retrying once");
        self.metrics.unauthorized_retry_total.add(1, &[]);
        let Some(token) = self.auth.refresh_after_rejection(&token.access_token).await else {
            return Err(AppError::AuthenticationFailed);
        };

        let response = self.dispatch(&method, &url, &token.authorization(), &customize).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Request rejected again after refresh, ending session");
            if let Err(e) = self.auth.logout().await {
                tracing::warn!(error = %e, "Could not clear session");
            }
            return Err(AppError::AuthenticationFailed);
        }
        error_for_status(response).await
    }

    /// # Errors
    /// See [`Self::send_authorized`]; also `AppError::Decode` for an unparseable body.
    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(path)?;
        let response = self.send_authorized(Method::GET, url, |rb| rb.query(query)).await?;
        decode_json(response).await
    }

    /// # Errors
    /// See [`Self::send_authorized`]; also `AppError::Decode` for an unparseable body.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.send_authorized(method, url, |rb| rb.json(body)).await?;
        decode_json(response).await
    }

    /// # Errors
    /// See [`Self::send_authorized`].
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        self.send_authorized(Method::DELETE, url, |rb| rb).await?;
        Ok(())
    }

    async fn dispatch<F>(&self, method: &Method, url: &Url, authorization: &str, customize: &F) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let request = self.http.request(method.clone(), url.clone()).header(AUTHORIZATION, authorization);
        let response = customize(request).send().await?;
        tracing::debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await?;
    Err(AppError::from_response_body(status, &body))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(AppError::Decode)
}
