use curator_core::{CoreError, LlmError};
use regex::Regex;
use reqwest::{Response, StatusCode};
use std::sync::LazyLock;
use tracing::warn;

static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

/// Extract the JSON array of terms from a model reply. The reply should be
/// the bare array, but models sometimes wrap it in prose, so the first
/// bracketed span is tried next.
pub fn parse_related_terms(provider: &str, reply: &str) -> Result<Vec<String>, CoreError> {
    let parsed = serde_json::from_str::<Vec<String>>(reply.trim()).ok().or_else(|| {
        BRACKETED_RE
            .find(reply)
            .and_then(|span| serde_json::from_str::<Vec<String>>(span.as_str()).ok())
    });

    match parsed {
        Some(terms) => Ok(terms
            .into_iter()
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
            .collect()),
        None => {
            warn!("Could not parse {} reply: {}", provider, reply);
            Err(CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: provider.to_string(),
            }))
        }
    }
}

pub(crate) fn send_error(provider: &str, error: reqwest::Error) -> CoreError {
    if error.is_timeout() {
        CoreError::Llm(LlmError::RequestTimeout {
            provider: provider.to_string(),
        })
    } else {
        CoreError::Network(error)
    }
}

/// Map a non-success status onto the error taxonomy.
pub(crate) async fn status_error(provider: &str, response: Response) -> CoreError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(60);
    let provider = provider.to_string();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CoreError::Llm(LlmError::AuthenticationFailed { provider })
        }
        StatusCode::TOO_MANY_REQUESTS => {
            CoreError::Llm(LlmError::RateLimitExceeded {
                provider,
                retry_after,
            })
        }
        status if status.is_server_error() => {
            CoreError::Llm(LlmError::ServiceUnavailable { provider })
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            CoreError::RequestFailed {
                message: format!("{} returned {}: {}", provider, status, body),
                status_code: Some(status.as_u16()),
            }
        }
    }
}
