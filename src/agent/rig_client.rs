use super::{CompletionError, CompletionProvider, CompletionRequest};
use crate::session::{Role, Turn};
use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::{Chat, Message},
};
use std::sync::Arc;
use tracing::debug;

pub struct Sampling {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

/// A completion provider backed by any rig client. One agent is built per
/// request so the system instruction always comes from the request itself.
pub struct RigClient<C: CompletionClient> {
    name: &'static str,
    client: C,
    sampling: Sampling,
}

impl<C: CompletionClient> RigClient<C> {
    pub fn new(name: &'static str, client: C, sampling: Sampling) -> Arc<Self> {
        Arc::new(Self {
            name,
            client,
            sampling,
        })
    }
}

fn to_message(turn: &Turn) -> Message {
    match turn.role {
        Role::User => Message::user(turn.content.clone()),
        Role::Assistant => Message::assistant(turn.content.clone()),
    }
}

#[async_trait]
impl<C> CompletionProvider for RigClient<C>
where
    C: CompletionClient + Send + Sync,
    C::CompletionModel: 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let (prompt, earlier) = request.split_prompt().ok_or(CompletionError::EmptyRequest)?;
        let history: Vec<Message> = earlier.iter().map(to_message).collect();

        debug!(
            "Sending {} turns to {} ({})",
            request.turns.len(),
            self.name,
            self.sampling.model
        );

        let agent = self
            .client
            .agent(&self.sampling.model)
            .preamble(&request.system)
            .temperature(self.sampling.temperature)
            .max_tokens(self.sampling.max_tokens)
            .build();

        let response = agent
            .chat(to_message(prompt), history)
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        if response.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(response)
    }
}
