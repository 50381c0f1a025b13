//! Fluent runner for test-executing a stored prompt.

use regex::Regex;
use std::collections::HashMap;

use super::completion::{ChunkStream, CompletionBackend, CompletionRequest};
use super::error::{RunError, StoreError};
use super::vault::PromptVault;
use super::RunOutput;
use crate::core::prompt::SavedRun;
use crate::core::utils::{new_id, now_millis};

/// A fluent builder to configure and execute a single test run.
pub struct TestRunner<'a> {
    vault: &'a PromptVault,
    id_or_title: &'a str,
    vars: HashMap<String, String>,
    backend: Option<&'a dyn CompletionBackend>,
    model: Option<String>,
    record: bool,
}

impl<'a> TestRunner<'a> {
    /// Creates a new `TestRunner`.
    pub(crate) fn new(vault: &'a PromptVault, id_or_title: &'a str) -> Self {
        Self {
            vault,
            id_or_title,
            vars: HashMap::new(),
            backend: None,
            model: None,
            record: true,
        }
    }

    /// Sets the variables for template substitution in the prompt.
    pub fn vars(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Sets the completion backend to execute the prompt with.
    /// If not set, `run()` will only perform template substitution and
    /// return the result.
    pub fn backend(mut self, backend: &'a dyn CompletionBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Overrides the model from the prompt's execution config for this run.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Whether a successful completion is saved to the prompt's run list.
    /// On by default.
    pub fn record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    fn build_request(&self, prompt: &crate::core::prompt::Prompt) -> CompletionRequest {
        let mut config = prompt.config.clone();
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        CompletionRequest {
            prompt: render_template(&prompt.content, &self.vars),
            system_instruction: prompt.system_instruction.clone(),
            examples: prompt.examples.clone(),
            config,
        }
    }

    /// Finds, renders, and executes the prompt. Starting a new run while
    /// another is in flight cancels the older one.
    pub async fn run(self) -> Result<RunOutput, RunError> {
        let prompt = self.vault.find(self.id_or_title).await?;
        let request = self.build_request(&prompt);

        let Some(backend) = self.backend else {
            return Ok(RunOutput::Rendered(request.prompt));
        };

        let cancel = self.vault.begin_run();
        let output = backend.complete(&request, &cancel).await?;

        if self.record {
            let run = SavedRun {
                id: new_id(),
                timestamp: now_millis(),
                model: request.config.model.clone(),
                vars: self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                output: output.clone(),
                rating: None,
            };
            self.vault.record_run(&prompt.id, run).await?;
        }

        Ok(RunOutput::Completion(output))
    }

    /// Like [`run`](Self::run), but yields the output as a chunk stream.
    /// Requires a backend; nothing is recorded, callers that want a saved
    /// run collect the chunks and record one themselves.
    pub async fn stream(self) -> Result<ChunkStream, RunError> {
        let prompt = self.vault.find(self.id_or_title).await?;
        let request = self.build_request(&prompt);

        let backend = self.backend.ok_or_else(|| {
            StoreError::Configuration("Streaming requires a completion backend".to_string())
        })?;

        let cancel = self.vault.begin_run();
        backend.stream(&request, &cancel).await
    }
}

/// Renders a template string with the given variables. Unknown placeholders
/// render as empty text.
pub(crate) fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    let re = match Regex::new(r"\{\{\s*(\w+)\s*\}\}") {
        Ok(re) => re,
        Err(_) => return template.to_string(),
    };
    re.replace_all(template, |caps: &regex::Captures| {
        let key = &caps[1];
        vars.get(key).map(|s| s.as_str()).unwrap_or("").to_string()
    })
    .into_owned()
}
