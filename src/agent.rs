use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use rig::providers::{anthropic, gemini, openai};
use std::sync::Arc;
use tracing::info;

mod error;
mod preamble;
mod prompt;
mod rig_client;

pub use error::CompletionError;
pub use preamble::{Persona, build_preamble};
pub use prompt::{CompletionRequest, assemble};
use rig_client::{RigClient, Sampling};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Sends one assembled request to a hosted model and returns the reply text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

pub fn create_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    let sampling = Sampling {
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    info!(
        "Completion provider: {} (model: {}, temperature: {}, max tokens: {})",
        config.api_provider, config.model, config.temperature, config.max_tokens
    );

    match config.api_provider.as_str() {
        "anthropic" => {
            let mut builder: anthropic::ClientBuilder = anthropic::Client::builder().api_key(&config.api_key);
            if let Some(url) = &config.api_url {
                builder = builder.base_url(url);
            }
            let client: anthropic::Client = builder.build()?;
            Ok(RigClient::new("anthropic", client, sampling) as Arc<dyn CompletionProvider>)
        }
        "gemini" => {
            let mut builder: gemini::client::ClientBuilder = gemini::Client::builder().api_key(&config.api_key);
            if let Some(url) = &config.api_url {
                builder = builder.base_url(url);
            }
            let client: gemini::Client = builder.build()?;
            Ok(RigClient::new("gemini", client, sampling) as Arc<dyn CompletionProvider>)
        }
        _ => {
            // Groq and other OpenAI-compatible endpoints speak chat completions.
            let url = config.api_url.as_deref().unwrap_or(GROQ_API_URL);
            let client: openai::CompletionsClient = openai::CompletionsClient::builder()
                .api_key(&config.api_key)
                .base_url(url)
                .build()?;
            Ok(RigClient::new("openai", client, sampling) as Arc<dyn CompletionProvider>)
        }
    }
}
