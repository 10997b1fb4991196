use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(String),
    #[error("Nothing to send")]
    EmptyRequest,
    #[error("Model returned an empty response")]
    EmptyResponse,
}
