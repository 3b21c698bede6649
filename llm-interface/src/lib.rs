//! Semantic keyword expansion through hosted LLM APIs.

mod claude;
mod openai;
mod prompt;
mod response;

pub use claude::ClaudeProvider;
pub use openai::OpenAiProvider;
pub use prompt::expansion_prompt;
pub use response::parse_related_terms;

use curator_core::{AppConfig, CoreError, ExpansionProvider, LlmError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Maps a free-text query onto related terms drawn from `vocabulary`.
pub trait SemanticExpander: Send + Sync {
    fn expand(
        &self,
        query: &str,
        vocabulary: &[String],
    ) -> impl Future<Output = Result<Vec<String>, CoreError>> + Send;
}

impl<T: SemanticExpander> SemanticExpander for Arc<T> {
    async fn expand(&self, query: &str, vocabulary: &[String]) -> Result<Vec<String>, CoreError> {
        self.as_ref().expand(query, vocabulary).await
    }
}

/// Expansion backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum ExpanderBackend {
    Claude(ClaudeProvider),
    OpenAi(OpenAiProvider),
    Disabled,
}

impl ExpanderBackend {
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let search = &config.search;
        let timeout = Duration::from_secs(search.timeout_secs);
        let api_key = || {
            config.api_key().map(str::to_string).ok_or_else(|| {
                CoreError::Llm(LlmError::InvalidApiKey {
                    provider: search.provider.as_str().to_string(),
                })
            })
        };

        let backend = match search.provider {
            ExpansionProvider::Claude => {
                let mut provider = ClaudeProvider::new(api_key()?).with_timeout(timeout)?;
                if let Some(model) = &search.model {
                    provider = provider.with_model(model);
                }
                if let Some(base_url) = &search.base_url {
                    provider = provider.with_base_url(base_url);
                }
                Self::Claude(provider)
            }
            ExpansionProvider::OpenAi => {
                let mut provider = OpenAiProvider::new(api_key()?).with_timeout(timeout)?;
                if let Some(model) = &search.model {
                    provider = provider.with_model(model);
                }
                if let Some(base_url) = &search.base_url {
                    provider = provider.with_base_url(base_url);
                }
                Self::OpenAi(provider)
            }
            ExpansionProvider::Disabled => Self::Disabled,
        };

        info!("Semantic expansion provider: {}", search.provider.as_str());
        Ok(backend)
    }
}

impl SemanticExpander for ExpanderBackend {
    async fn expand(&self, query: &str, vocabulary: &[String]) -> Result<Vec<String>, CoreError> {
        match self {
            Self::Claude(provider) => provider.expand(query, vocabulary).await,
            Self::OpenAi(provider) => provider.expand(query, vocabulary).await,
            Self::Disabled => Err(CoreError::Llm(LlmError::ModelNotAvailable {
                model: "disabled".to_string(),
            })),
        }
    }
}
