use llm::builder::LLMBackend;
use prompt_vault::api::LlmBackend;
use prompt_vault::core::config::SyncSettings;
use prompt_vault::core::store::VaultPaths;
use prompt_vault::{PromptVault, RunOutput};

#[tokio::main]
async fn main() {
    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");

    let paths = VaultPaths::resolve().expect("vault directory");
    let mut vault = PromptVault::open_at(&paths, SyncSettings::default())
        .await
        .expect("open vault");
    vault.start().await;

    let backend = LlmBackend::new(LLMBackend::OpenAI, "gpt-4o-mini").api_key(api_key);

    // Runs the stored prompt named "welcome"; the completion is saved to
    // its run list automatically.
    let output = vault
        .test("welcome")
        .vars([("name", "Alice")])
        .backend(&backend)
        .run()
        .await
        .expect("Prompt execution failed");

    if let RunOutput::Completion(text) = output {
        println!("{}", text);
    }

    vault.close().await;
}
