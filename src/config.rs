use clap::{Args, Parser, ValueEnum};
use reqwest::Url;
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub api: ApiConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ApiConfig {
    /// Base URL of the forms backend
    #[arg(long, env = "FORMS_API_URL", default_value = "http://localhost:5000/")]
    pub base_url: Url,

    /// Timeout applied to every HTTP request in seconds
    #[arg(long, env = "FORMS_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "FORMS_USER_AGENT", default_value = concat!("forms-client/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// OAuth client identifier sent with token requests
    #[arg(long, env = "FORMS_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Scopes requested on password login
    #[arg(long, env = "FORMS_SCOPE", default_value = "openid offline_access")]
    pub scope: String,

    /// Path of the token endpoint, relative to the base URL
    #[arg(long, env = "FORMS_TOKEN_PATH", default_value = "api/connect/token")]
    pub token_path: String,
}

#[derive(Clone, Debug, Args)]
pub struct StorageConfig {
    /// Directory holding the persisted session
    #[arg(long, env = "FORMS_TOKEN_DIR", default_value = ".forms-client")]
    pub token_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "FORMS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are only exported when set
    #[arg(long, env = "FORMS_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { client_id: None, scope: "openid offline_access".to_string(), token_path: "api/connect/token".to_string() }
    }
}
