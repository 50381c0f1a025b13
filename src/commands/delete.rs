use console::style;

use crate::api::PromptVault;

/// Move a prompt to the trash.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    if p.is_trashed() {
        return Err(format!("Prompt '{}' is already in the trash", p.title));
    }
    vault.soft_delete(&p.id).await.map_err(|e| e.to_string())?;
    println!(
        "{} Prompt '{}' moved to trash (use 'restore {}' to undo)",
        style("•").green().bold(),
        p.title,
        p.id
    );
    Ok(())
}
