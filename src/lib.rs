pub mod api;
pub mod cli;
pub mod commands;
pub mod core;

pub use api::{PromptVault, RunError, RunOutput, StoreError};
