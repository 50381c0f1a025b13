use console::style;

use crate::api::PromptVault;

/// Duplicate a prompt under a fresh identity.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    let copy = vault.duplicate(&p.id).await.map_err(|e| e.to_string())?;
    println!(
        "{} Duplicated as {} with title '{}'",
        style("•").green().bold(),
        style(&copy.id).yellow(),
        copy.title
    );
    Ok(())
}
