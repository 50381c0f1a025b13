//! High-level fluent API for managing and test-running prompts.

mod completion;
mod error;
mod llm_bridge;
mod runner;
mod vault;

pub use completion::{ChunkStream, CompletionBackend, CompletionRequest};
pub use error::{CategoryError, RunError, StoreError};
pub use llm_bridge::LlmBackend;
pub use runner::TestRunner;
pub use vault::{PromptVault, VisiblePage, DEFAULT_THEME};

/// Result of a test run.
#[derive(Debug, Clone)]
pub enum RunOutput {
    /// The rendered prompt text, when no backend was attached.
    Rendered(String),
    /// The backend's generated completion.
    Completion(String),
}
