//! This example walks through the library surface without any LLM:
//! creating a prompt, editing it (which snapshots the old version),
//! rendering it locally, and filtering the library.

use prompt_vault::core::config::SyncSettings;
use prompt_vault::core::filter::CategoryFilter;
use prompt_vault::core::prompt::PromptPatch;
use prompt_vault::core::store::VaultPaths;
use prompt_vault::{PromptVault, RunOutput};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Open a vault in a scratch directory and start the sync machinery.
    let dir = std::env::temp_dir().join("prompt-vault-demo");
    let paths = VaultPaths::under(dir)?;
    let mut vault = PromptVault::open_at(&paths, SyncSettings::default()).await?;
    vault.start().await;

    // 2. Create a prompt.
    let prompt = vault
        .create(PromptPatch {
            title: Some("Summarizer".to_string()),
            content: Some("Summarize the following text:\n\n{{text}}".to_string()),
            category: Some("Writing".to_string()),
            tags: Some(vec!["nlp".to_string()]),
            ..Default::default()
        })
        .await;
    println!("Created {} '{}'", prompt.id, prompt.title);

    // 3. A content edit snapshots the previous version automatically.
    vault
        .update(
            &prompt.id,
            PromptPatch {
                content: Some("Summarize in three bullet points:\n\n{{text}}".to_string()),
                ..Default::default()
            },
        )
        .await?;
    let updated = vault.get(&prompt.id).await.expect("prompt exists");
    println!("History now holds {} version(s)", updated.history.len());

    // 4. Render it locally. Without a backend, run() just substitutes vars.
    let output = vault
        .test(&prompt.id)
        .vars([("text", "Rust is a systems programming language.")])
        .run()
        .await?;
    if let RunOutput::Rendered(text) = output {
        println!("Rendered prompt:\n{}", text);
    }

    // 5. Filter the library through the persistent view.
    vault
        .update_view(|v| v.set_category(CategoryFilter::Named("Writing".to_string())))
        .await;
    let page = vault.visible().await;
    println!("{} prompt(s) in Writing", page.total);

    // 6. Flush pending writes and shut down.
    vault.close().await;
    Ok(())
}
