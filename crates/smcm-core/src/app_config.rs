use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub storage_signing_secret: String,
    pub signed_url_ttl_secs: u64,
    pub vision_endpoint: Option<String>,
    pub vision_api_key: Option<String>,
    pub vision_request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub media_pending_max_age_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("storage_root", &self.storage_root)
            .field("public_base_url", &self.public_base_url)
            .field("database_url", &"[redacted]")
            .field("storage_signing_secret", &"[redacted]")
            .field("signed_url_ttl_secs", &self.signed_url_ttl_secs)
            .field("vision_endpoint", &self.vision_endpoint)
            .field(
                "vision_api_key",
                &self.vision_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "vision_request_timeout_secs",
                &self.vision_request_timeout_secs,
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "media_pending_max_age_secs",
                &self.media_pending_max_age_secs,
            )
            .finish()
    }
}
