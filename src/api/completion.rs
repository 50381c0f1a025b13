//! The boundary between test runs and whatever produces completions.

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use super::error::RunError;
use crate::core::prompt::{Example, PromptConfig};

/// Lazy sequence of incremental output chunks from a streaming run.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, RunError>> + Send>>;

/// Everything a backend needs for one completion: the rendered prompt plus
/// the prompt's own system instruction, few-shot examples, and sampling
/// parameters.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub examples: Vec<Example>,
    pub config: PromptConfig,
}

/// A completion producer. Implementations must honor `cancel` promptly;
/// a cancelled request returns [`RunError::Cancelled`] instead of output.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Produce the full completion in one piece.
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, RunError>;

    /// Produce the completion as a chunk stream. The default runs
    /// [`complete`](Self::complete) and yields its output as a single
    /// chunk, so non-streaming backends satisfy the streaming contract
    /// for free.
    async fn stream(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, RunError> {
        let text = self.complete(request, cancel).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}
