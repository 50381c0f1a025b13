use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::api::PromptVault;

/// Permanently delete a trashed prompt. Refuses anything still live.
pub async fn run(vault: &PromptVault, id: &str, yes: bool) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    if !p.is_trashed() {
        return Err(format!(
            "Prompt '{}' is not in the trash. Delete it first, then purge",
            p.title
        ));
    }

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Permanently delete '{}'? This cannot be undone",
                p.title
            ))
            .default(false)
            .interact()
            .map_err(|e| format!("Confirm error: {}", e))?;
        if !confirmed {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }
    }

    vault
        .permanent_delete(&p.id)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "{} Prompt '{}' permanently deleted",
        style("•").green().bold(),
        p.title
    );
    Ok(())
}
