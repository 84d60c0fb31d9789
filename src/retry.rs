use std::time::Duration;

use crate::config::Config;
use crate::error::RigspecError;
use crate::gemini::{GeminiClient, GenerateContentRequest, GenerateContentResponse};

/// Max outbound call attempts per invocation.
pub const MAX_ATTEMPTS: u32 = 5;

/// Delay before the retry following a failure on `attempt` (0-based):
/// base x 2^attempt, so 1, 2, 4, 8 base units across the budget.
/// No jitter and no cap; the hosting platform's request timeout is the
/// real backstop.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt)
}

/// Run the outbound call with bounded retry. Attempts are strictly
/// sequential. Non-retryable errors (auth faults, unhandled statuses)
/// terminate the loop immediately without consuming further attempts;
/// exhausting the budget surfaces the last captured failure.
pub async fn generate_with_retry(
    client: &GeminiClient,
    config: &Config,
    api_key: &str,
    request: &GenerateContentRequest,
) -> Result<GenerateContentResponse, RigspecError> {
    for attempt in 0..MAX_ATTEMPTS {
        let err = match client
            .generate(&config.base_url, &config.model, api_key, request)
            .await
        {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if !err.is_retryable() {
            tracing::error!(attempt = attempt + 1, error = %err, "provider call failed, not retryable");
            return Err(err);
        }

        if attempt + 1 == MAX_ATTEMPTS {
            tracing::error!(attempts = MAX_ATTEMPTS, error = %err, "retry budget exhausted");
            return Err(err);
        }

        let delay = backoff_delay(config.retry_base, attempt);
        tracing::warn!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "provider call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }

    unreachable!("retry loop returns within the attempt budget")
}
