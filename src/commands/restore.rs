use console::style;

use crate::api::PromptVault;

/// Restore a prompt from the trash.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    if !p.is_trashed() {
        return Err(format!("Prompt '{}' is not in the trash", p.title));
    }
    vault.restore(&p.id).await.map_err(|e| e.to_string())?;
    println!(
        "{} Prompt '{}' restored",
        style("•").green().bold(),
        p.title
    );
    Ok(())
}
