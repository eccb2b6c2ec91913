use crate::adapters::storage::{FileSecureStore, MemorySecureStore, SecureStore};
use crate::api::ApiClient;
use crate::config::{ApiConfig, AuthConfig, Config};
use crate::error::Result;
use crate::services::auth_service::AuthService;
use crate::services::category_service::CategoryService;
use crate::services::form_service::FormService;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

/// Wired client: one session shared by every resource service.
#[derive(Clone, Debug)]
pub struct FormsClient {
    pub auth: Arc<AuthService>,
    pub forms: FormService,
    pub categories: CategoryService,
}

#[derive(Debug)]
pub struct ClientBuilder {
    api: ApiConfig,
    auth: AuthConfig,
    store: Option<Arc<dyn SecureStore>>,
}

impl ClientBuilder {
    #[must_use]
    pub const fn new(api: ApiConfig, auth: AuthConfig) -> Self {
        Self { api, auth, store: None }
    }

    /// Builder that persists the session under the configured token directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api.clone(), config.auth.clone())
            .with_store(Arc::new(FileSecureStore::new(config.storage.token_dir.clone())))
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed or the token endpoint
    /// does not form a valid URL.
    pub fn build(self) -> Result<FormsClient> {
        let http = Client::builder()
            .timeout(Duration::from_secs(self.api.request_timeout_secs))
            .user_agent(self.api.user_agent.as_str())
            .build()?;
        let base_url = normalize_base_url(self.api.base_url);
        let store = self.store.unwrap_or_else(|| Arc::new(MemorySecureStore::new()) as Arc<dyn SecureStore>);

        let auth = Arc::new(AuthService::new(http.clone(), &base_url, self.auth, store)?);
        let api = ApiClient::new(http, base_url, Arc::clone(&auth));

        Ok(FormsClient { auth, forms: FormService::new(api.clone()), categories: CategoryService::new(api) })
    }
}

/// Relative endpoint paths are joined onto the base, which therefore has to end in `/`.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
