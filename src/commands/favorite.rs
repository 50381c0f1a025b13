use console::style;

use crate::api::PromptVault;

/// Toggle a prompt's favorite flag.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    let now_favorite = vault
        .toggle_favorite(&p.id)
        .await
        .map_err(|e| e.to_string())?;
    if now_favorite {
        println!(
            "{} '{}' added to favorites",
            style("★").yellow().bold(),
            p.title
        );
    } else {
        println!(
            "{} '{}' removed from favorites",
            style("•").green().bold(),
            p.title
        );
    }
    Ok(())
}
