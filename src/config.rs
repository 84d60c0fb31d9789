use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Clone)]
pub struct Config {
    /// Gemini API key. Optional at load; its absence is reported per-request
    /// as NO_API_KEY_CONFIGURED instead of refusing to start.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub bind_addr: String,
    /// Base delay for exponential backoff between retryable provider
    /// failures. The doubling sequence (1x, 2x, 4x, 8x) is fixed.
    pub retry_base: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        if api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set: generation requests will fail");
        }

        let model = env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = env::var("GEMINI_BASE_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let bind_addr = env::var("RIGSPEC_BIND")
            .ok()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let retry_base = env::var("RIGSPEC_RETRY_BASE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(1));

        Config {
            api_key,
            model,
            base_url,
            bind_addr,
            retry_base,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("bind_addr", &self.bind_addr)
            .field("retry_base", &self.retry_base)
            .finish()
    }
}
