use console::style;

use crate::api::PromptVault;
use crate::core::prompt::PromptPatch;

/// Apply tag changes: '+name' or a bare name adds, '-name' removes.
pub async fn run(vault: &PromptVault, id: &str, changes: &[String]) -> Result<(), String> {
    if changes.is_empty() {
        return Err("No tag changes given. Use '+name' to add, '-name' to remove".to_string());
    }

    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    let mut tags = p.tags.clone();

    for change in changes {
        if let Some(name) = change.strip_prefix('-') {
            tags.retain(|t| t != name);
        } else {
            let name = change.strip_prefix('+').unwrap_or(change);
            if name.is_empty() {
                continue;
            }
            if !tags.iter().any(|t| t == name) {
                tags.push(name.to_string());
            }
        }
    }

    if tags == p.tags {
        println!("{}", style("Tags unchanged.").yellow());
        return Ok(());
    }

    vault
        .update(
            &p.id,
            PromptPatch {
                tags: Some(tags.clone()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;

    if tags.is_empty() {
        println!("{} '{}' now has no tags", style("•").green().bold(), p.title);
    } else {
        println!(
            "{} '{}' tags: {}",
            style("•").green().bold(),
            p.title,
            tags.join(", ")
        );
    }
    Ok(())
}
