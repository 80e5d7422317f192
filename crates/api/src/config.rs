use std::path::PathBuf;

use auditdesk_core::uploads::{DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_MAX_UPLOAD_BYTES};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// Root directory of stored uploads and generated documents.
    pub storage_root: PathBuf,
    /// Directory holding the `.docx` templates.
    pub templates_dir: PathBuf,
    /// Ceiling for a single uploaded file, in bytes.
    pub max_upload_bytes: usize,
    /// Window in which an identical upload counts as a double submit.
    pub duplicate_window_secs: i64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `3000`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                       |
    /// | `STORAGE_ROOT`                 | `storage`                  |
    /// | `TEMPLATES_DIR`                | `templates`                |
    /// | `MAX_UPLOAD_BYTES`             | `20971520` (20 MiB)        |
    /// | `DUPLICATE_UPLOAD_WINDOW_SECS` | `60`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let storage_root =
            PathBuf::from(std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage".into()));
        let templates_dir =
            PathBuf::from(std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| "templates".into()));

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let duplicate_window_secs: i64 = std::env::var("DUPLICATE_UPLOAD_WINDOW_SECS")
            .unwrap_or_else(|_| DEFAULT_DUPLICATE_WINDOW_SECS.to_string())
            .parse()
            .expect("DUPLICATE_UPLOAD_WINDOW_SECS must be a valid i64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            storage_root,
            templates_dir,
            max_upload_bytes,
            duplicate_window_secs,
            jwt,
        }
    }

    /// Request bodies may carry one file plus multipart framing.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_upload_bytes + 1024 * 1024
    }
}
