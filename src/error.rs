use thiserror::Error;

#[derive(Debug, Error)]
pub enum RigspecError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("provider rejected the request ({status}): check API key and request format")]
    ProviderAuth { status: u16, message: String },

    #[error("provider unavailable after retries ({status})")]
    ProviderTransient { status: u16, message: String },

    #[error("provider returned unhandled status {status}")]
    ProviderStatus { status: u16, message: String },

    #[error("generation returned no content (finish reason: {finish_reason})")]
    EmptyGeneration {
        finish_reason: String,
        safety: Option<String>,
    },

    #[error("failed to parse generated component list")]
    OutputParse(String),

    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RigspecError {
    /// Returns true for transient errors that may succeed on retry.
    /// Only rate limiting (429), server errors (5xx), and connection-level
    /// failures are retryable; everything else terminates immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderTransient { .. } | Self::Transport(_)
        )
    }

    /// HTTP status band for the caller-facing response.
    /// 400 for caller-input faults, 500 for everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// Stable machine-readable tag for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::MissingApiKey => "NO_API_KEY_CONFIGURED",
            Self::ProviderAuth { .. } => "PROVIDER_AUTH_ERROR",
            Self::ProviderTransient { .. } => "PROVIDER_TRANSIENT_ERROR",
            Self::ProviderStatus { .. } => "PROVIDER_UNHANDLED_STATUS",
            Self::EmptyGeneration { .. } => "EMPTY_GENERATION",
            Self::OutputParse(_) => "OUTPUT_PARSE_ERROR",
            Self::Transport(_) => "PROVIDER_REQUEST_FAILED",
        }
    }

    /// Diagnostic detail for the response body, where one exists.
    /// Carries the provider's own message (or the parse error) so callers
    /// can see why the upstream call failed without reading our logs.
    pub fn error_details(&self) -> Option<String> {
        match self {
            Self::ProviderAuth { message, .. }
            | Self::ProviderTransient { message, .. }
            | Self::ProviderStatus { message, .. } => Some(message.clone()),
            Self::EmptyGeneration { safety, .. } => safety.clone(),
            Self::OutputParse(detail) => Some(detail.clone()),
            Self::Transport(e) => Some(e.to_string()),
            _ => None,
        }
    }
}
