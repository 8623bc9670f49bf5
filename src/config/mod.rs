use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub query: QueryConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Connection settings for the hosted backend (Postgres + object storage)
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Privileged key; server-only, bypasses row-level security
    #[serde(skip_serializing)]
    pub service_role_key: Option<String>,
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub profile_timeout_ms: u64,
    pub admin_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub image_bucket: String,
    pub max_upload_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Backend
        self.backend.url = env::var("PND_BACKEND_URL").ok().or(self.backend.url);
        self.backend.anon_key = env::var("PND_ANON_KEY").ok().or(self.backend.anon_key);
        self.backend.service_role_key = env::var("PND_SERVICE_ROLE_KEY").ok().or(self.backend.service_role_key);
        self.backend.database_url = env::var("DATABASE_URL").ok().or(self.backend.database_url);
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.backend.max_connections = v.parse().unwrap_or(self.backend.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.backend.connection_timeout_secs = v.parse().unwrap_or(self.backend.connection_timeout_secs);
        }

        // Auth
        if let Ok(v) = env::var("PND_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_PROFILE_TIMEOUT_MS") {
            self.auth.profile_timeout_ms = v.parse().unwrap_or(self.auth.profile_timeout_ms);
        }
        if let Ok(v) = env::var("AUTH_ADMIN_ROLE") {
            self.auth.admin_role = v;
        }

        // Query
        if let Ok(v) = env::var("QUERY_DEFAULT_PAGE_SIZE") {
            self.query.default_page_size = v.parse().unwrap_or(self.query.default_page_size);
        }
        if let Ok(v) = env::var("QUERY_MAX_PAGE_SIZE") {
            self.query.max_page_size = v.parse().unwrap_or(self.query.max_page_size);
        }
        if let Ok(v) = env::var("QUERY_DEBUG_LOGGING") {
            self.query.debug_logging = v.parse().unwrap_or(self.query.debug_logging);
        }

        // Storage
        if let Ok(v) = env::var("STORAGE_IMAGE_BUCKET") {
            self.storage.image_bucket = v;
        }
        if let Ok(v) = env::var("STORAGE_MAX_UPLOAD_BYTES") {
            self.storage.max_upload_bytes = v.parse().unwrap_or(self.storage.max_upload_bytes);
        }

        // API
        if let Some(port) = env::var("PND_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_CORS_ORIGINS") {
            self.api.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            backend: BackendConfig {
                max_connections: 5,
                connection_timeout_secs: 30,
                ..Default::default()
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                profile_timeout_ms: 5_000,
                admin_role: "admin".to_string(),
            },
            query: QueryConfig {
                default_page_size: 20,
                max_page_size: 200,
                debug_logging: true,
            },
            storage: StorageConfig::default(),
            api: ApiConfig {
                port: 3000,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.backend.max_connections = 10;
        config.backend.connection_timeout_secs = 10;
        config.query.max_page_size = 100;
        config.query.debug_logging = false;
        config.api.cors_origins = vec![];
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.backend.max_connections = 20;
        config.backend.connection_timeout_secs = 5;
        config
    }

    /// Whether object storage uploads can be performed
    pub fn storage_enabled(&self) -> bool {
        self.backend.url.is_some() && self.backend.service_role_key.is_some()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_bucket: "question-images".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_content_types: ["image/png", "image/jpeg", "image/webp", "image/gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() { "<set>" } else { "<unset>" }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("backend_url", &self.backend.url)
            .field("anon_key", &redact(&self.backend.anon_key))
            .field("service_role_key", &redact(&self.backend.service_role_key))
            .field("database_url", &redact(&self.backend.database_url))
            .field("jwt_secret", &if self.auth.jwt_secret.is_empty() { "<unset>" } else { "<set>" })
            .field("query", &self.query)
            .field("storage", &self.storage)
            .field("api", &self.api)
            .finish()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.query.default_page_size, 20);
        assert_eq!(config.query.max_page_size, 200);
        assert_eq!(config.auth.profile_timeout_ms, 5_000);
        assert!(!config.storage_enabled());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.query.max_page_size, 100);
        assert!(!config.query.debug_logging);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::development();
        config.backend.service_role_key = Some("super-secret".to_string());
        config.auth.jwt_secret = "jwt-secret".to_string();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("jwt-secret"));
        assert!(rendered.contains("<set>"));
    }
}
