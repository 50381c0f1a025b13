use futures::StreamExt;
use llm::builder::LLMBackend;
use spinners::{Spinner, Spinners};
use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;

use crate::api::{LlmBackend, PromptVault, RunOutput};
use crate::core::config::{ProviderSpec, VaultConfig};
use crate::core::prompt::SavedRun;
use crate::core::utils::{new_id, now_millis};

pub struct Options {
    pub id: String,
    pub provider: Option<String>,
    pub backend: Option<String>,
    pub model: Option<String>,
    pub vars: Vec<String>,
    pub stream: bool,
    pub no_record: bool,
}

/// Execute a prompt with an LLM, print the response, and save the run.
pub async fn run(vault: &PromptVault, config: &VaultConfig, opts: Options) -> Result<(), String> {
    let mut vars = HashMap::new();
    for v in &opts.vars {
        if let Some((key, value)) = v.split_once('=') {
            vars.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let prompt = vault.find(&opts.id).await.map_err(|e| e.to_string())?;
    let (backend, default_model) =
        build_backend(config, opts.provider.as_deref(), opts.backend.as_deref())?;

    // Resolve the model up front so recorded runs name what actually ran.
    let model = opts.model.clone().unwrap_or_else(|| {
        if prompt.config.model.is_empty() {
            default_model
        } else {
            prompt.config.model.clone()
        }
    });

    if opts.stream {
        let mut stream = vault
            .test(&prompt.id)
            .vars(vars.clone())
            .backend(&backend)
            .model(model.clone())
            .stream()
            .await
            .map_err(|e| e.to_string())?;

        let mut full = String::new();
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            print!("{}", chunk);
            stdout.flush().ok();
            full.push_str(&chunk);
        }
        println!();

        if !opts.no_record {
            let run = SavedRun {
                id: new_id(),
                timestamp: now_millis(),
                model,
                vars: vars.into_iter().collect(),
                output: full,
                rating: None,
            };
            vault
                .record_run(&prompt.id, run)
                .await
                .map_err(|e| e.to_string())?;
        }
        return Ok(());
    }

    let mut sp = Spinner::new(Spinners::Dots9, "Waiting for LLM response...".into());
    let result = vault
        .test(&prompt.id)
        .vars(vars)
        .backend(&backend)
        .model(model)
        .record(!opts.no_record)
        .run()
        .await;

    match result {
        Ok(output) => {
            sp.stop_with_message("✔ Response received.".into());
            let text = match output {
                RunOutput::Completion(text) | RunOutput::Rendered(text) => text,
            };
            println!("\n{}", text);
            Ok(())
        }
        Err(e) => {
            sp.stop_with_message("✖ Run failed.".into());
            Err(e.to_string())
        }
    }
}

/// Pick the backend: an ad-hoc 'provider:model' argument wins, otherwise
/// the configured provider. Returns the backend plus its default model.
fn build_backend(
    config: &VaultConfig,
    provider: Option<&str>,
    backend_arg: Option<&str>,
) -> Result<(LlmBackend, String), String> {
    if let Some(arg) = backend_arg {
        let (provider_str, model) = arg
            .split_once(':')
            .ok_or("Invalid backend format. Use 'provider:model'")?;
        let kind = LLMBackend::from_str(provider_str)
            .map_err(|_| format!("Unknown provider: {}", provider_str))?;
        let spec = ProviderSpec {
            backend: kind,
            model: model.to_string(),
            api_key_env: None,
            base_url: None,
        };
        let backend = LlmBackend::from_spec(provider_str, &spec).map_err(|e| e.to_string())?;
        return Ok((backend, spec.model));
    }

    let (name, spec) = config.providers.resolve(provider)?;
    let backend = LlmBackend::from_spec(name, spec).map_err(|e| e.to_string())?;
    Ok((backend, spec.model.clone()))
}
