use super::base::Usage;
use super::errors::ProviderError;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::debug;

// Maps a non-ok response status to a ProviderError
pub async fn non_ok_response_to_provider_error(
    payload: &Value,
    response: Response,
) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Authentication(format!("Authentication failed. Please ensure your API keys are valid and have the required permissions. \
                Status: {}. Response: {}", status, body))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::RateLimitExceeded(format!("Rate limit exceeded. Please retry after some time. Status: {}", status))
        }
        status if status.is_server_error() => {
            ProviderError::ServerError(format!("Server error occurred. Status: {}", status))
        }
        StatusCode::BAD_REQUEST if is_context_length_message(&body) => {
            ProviderError::ContextLengthExceeded(body)
        }
        _ => {
            debug!(
                "Provider request failed with status: {}. Body: {}. Payload: {}",
                status, body, payload
            );
            ProviderError::RequestFailed(format!("Request failed with status: {}. Body: {}", status, body))
        }
    }
}

fn is_context_length_message(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("context_length_exceeded")
        || body.contains("prompt is too long")
        || body.contains("maximum context length")
}

pub async fn handle_response(payload: &Value, response: Response) -> Result<Value, ProviderError> {
    match response.status() {
        StatusCode::OK => response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParseError(e.to_string())),
        _ => Err(non_ok_response_to_provider_error(payload, response).await),
    }
}

/// Extract the model name from a JSON object. Common with most providers to have this top level attribute.
pub fn get_model(data: &Value) -> String {
    data.get("model")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown")
        .to_string()
}

/// Read an integer field, accepting both signed and unsigned JSON numbers
pub fn get_i64(data: &Value, key: &str) -> Option<i64> {
    data.get(key).and_then(|v| v.as_i64())
}

pub fn emit_debug_trace<T: serde::Serialize>(
    model_config: &T,
    payload: &Value,
    response: &Value,
    usage: &Usage,
) {
    debug!(
        model_config = %serde_json::to_string_pretty(model_config).unwrap_or_default(),
        input = %serde_json::to_string_pretty(payload).unwrap_or_default(),
        output = %serde_json::to_string_pretty(response).unwrap_or_default(),
        input_tokens = ?usage.input_tokens.unwrap_or_default(),
        output_tokens = ?usage.output_tokens.unwrap_or_default(),
        total_tokens = ?usage.total_tokens.unwrap_or_default(),
    );
}
