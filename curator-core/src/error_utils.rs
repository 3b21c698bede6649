use crate::error::*;
use tracing::{error, warn};

/// How loudly an error should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Bad input or a transient failure; trying again may help.
    Warning,
    /// Misconfiguration or a failure the user cannot fix by retrying.
    Error,
}

pub trait ErrorExt {
    fn is_retryable(&self) -> bool;
    fn severity(&self) -> ErrorSeverity;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> &'static str;
}

impl ErrorExt for CoreError {
    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Source(e) => matches!(
                e,
                SourceError::RateLimitExceeded { .. }
                    | SourceError::RequestTimeout
                    | SourceError::ServerError { .. }
            ),
            CoreError::Store(e) => matches!(
                e,
                StoreError::DatabaseLocked | StoreError::ConnectionFailed { .. }
            ),
            CoreError::Llm(e) => matches!(
                e,
                LlmError::RateLimitExceeded { .. }
                    | LlmError::ServiceUnavailable { .. }
                    | LlmError::RequestTimeout { .. }
            ),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::RequestFailed { status_code, .. } => {
                matches!(status_code, Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Feed(_) | CoreError::InvalidInput { .. } | CoreError::NotFound { .. } => {
                ErrorSeverity::Warning
            }
            _ if self.is_retryable() => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Feed(e) => feed_message(e),
            CoreError::Source(e) => source_message(e),
            CoreError::Store(e) => store_message(e),
            CoreError::Llm(e) => llm_message(e),
            CoreError::Config(e) => config_message(e),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            CoreError::RequestFailed { message, .. } => format!("Request failed: {}", message),
            CoreError::Io(_) | CoreError::Serialization(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::Feed(_) => "FEED",
            CoreError::Source(_) => "POST_SOURCE",
            CoreError::Store(_) => "STORE",
            CoreError::Llm(_) => "LLM",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::RequestFailed { .. } => "REQUEST_FAILED",
        }
    }
}

fn feed_message(error: &FeedError) -> String {
    match error {
        FeedError::NotASequence { .. } => {
            "The post source returned data in an unexpected shape.".to_string()
        }
        FeedError::PostNotFound { post_id } => {
            format!("Post '{}' is not in the current feed.", post_id)
        }
        FeedError::UnknownInteraction { value } => format!(
            "'{}' is not a valid interaction. Use like, dislike or neutral.",
            value
        ),
        FeedError::UnknownSortKey { value } => format!(
            "'{}' is not a valid sort order. Use rank, date, likes or comments.",
            value
        ),
        FeedError::UnknownViewMode { value } => {
            format!("'{}' is not a valid view. Use all or followed.", value)
        }
        FeedError::UnknownPlatform { value } => format!(
            "'{}' is not a known platform. Use twitter, instagram, facebook or unknown.",
            value
        ),
    }
}

fn source_message(error: &SourceError) -> String {
    match error {
        SourceError::Unavailable { location } => {
            format!("Could not reach the post source at {}.", location)
        }
        SourceError::RateLimitExceeded { retry_after } => format!(
            "The post source is busy. Please wait {} seconds before trying again.",
            retry_after
        ),
        SourceError::RequestTimeout => {
            "Request to the post source timed out. Please try again.".to_string()
        }
        SourceError::ServerError { status_code } => format!(
            "The post source failed with status {}. Please try again later.",
            status_code
        ),
        SourceError::InvalidDocument { .. } => {
            "The post source returned a document that could not be read.".to_string()
        }
    }
}

fn store_message(error: &StoreError) -> String {
    match error {
        StoreError::DatabaseLocked => "Storage is temporarily busy. Please try again.".to_string(),
        StoreError::WriteFailed { .. } => {
            "Your changes could not be saved. They will apply for this session only.".to_string()
        }
        StoreError::MigrationFailed { .. } => {
            "The storage schema could not be upgraded.".to_string()
        }
        StoreError::ConnectionFailed { .. } | StoreError::NotConnected | StoreError::Sql(_) => {
            "Saved feed state could not be reached. Please try again.".to_string()
        }
    }
}

fn llm_message(error: &LlmError) -> String {
    match error {
        LlmError::AuthenticationFailed { provider } | LlmError::InvalidApiKey { provider } => {
            format!(
                "The {} API key was rejected or is missing. Please check your credentials.",
                provider
            )
        }
        LlmError::RateLimitExceeded {
            provider,
            retry_after,
        } => format!(
            "Rate limit exceeded for {}. Please wait {} seconds.",
            provider, retry_after
        ),
        LlmError::ModelNotAvailable { model } => format!(
            "Model '{}' is not available. Semantic search is turned off.",
            model
        ),
        LlmError::ServiceUnavailable { provider } | LlmError::RequestTimeout { provider } => {
            format!("{} did not answer. Related-term search is unavailable.", provider)
        }
        LlmError::InvalidResponseFormat { provider } => {
            format!("{} returned related terms in an unreadable form.", provider)
        }
    }
}

fn config_message(error: &ConfigError) -> String {
    match error {
        ConfigError::FileNotReadable { path } => {
            format!("Configuration file '{}' could not be read.", path)
        }
        ConfigError::MissingField { field } => {
            format!("Required configuration field '{}' is missing.", field)
        }
        ConfigError::InvalidValue { field, .. } => {
            format!("Invalid value for configuration field '{}'.", field)
        }
        ConfigError::Parse(_) => {
            "Configuration file format is invalid. Please check the settings.".to_string()
        }
    }
}

/// Logs a failed command once, at the level its severity calls for.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report(&self, error: &CoreError) -> ErrorSeverity {
        let severity = error.severity();
        let hint = if error.is_retryable() {
            " (retryable)"
        } else {
            ""
        };
        match severity {
            ErrorSeverity::Warning => warn!("[{}] {}{}", error.error_code(), error, hint),
            ErrorSeverity::Error => error!("[{}] {:?}{}", error.error_code(), error, hint),
        }
        severity
    }
}
