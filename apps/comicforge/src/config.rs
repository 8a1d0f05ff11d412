use anyhow::{Context, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration loaded from environment variables.
///
/// The Google API key is intentionally NOT part of this struct: it is read
/// from `GOOGLE_API_KEY` right before each generation call so a rotated key
/// takes effect without a restart.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    /// Upper bound on the optional story plot, in characters.
    pub max_plot_chars: usize,
    /// Request body limit for reference image uploads.
    pub max_upload_bytes: usize,
    /// Sessions unused for this many seconds are dropped. 0 keeps them forever.
    pub session_idle_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gemini_model: optional_env("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            max_plot_chars: optional_env("MAX_PLOT_CHARS")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_PLOT_CHARS must be a positive integer")?
                .unwrap_or(500),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?
                .unwrap_or(10 * 1024 * 1024),
            session_idle_secs: optional_env("SESSION_IDLE_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("SESSION_IDLE_SECS must be a non-negative integer")?
                .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            max_plot_chars: 500,
            max_upload_bytes: 10 * 1024 * 1024,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

/// Reads an env var, treating unset and blank values the same.
pub fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
