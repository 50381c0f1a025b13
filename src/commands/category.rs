use console::style;

use crate::api::PromptVault;
use crate::core::prompt::STANDARD_CATEGORIES;

/// Create a custom category.
pub async fn add(vault: &PromptVault, name: &str) -> Result<(), String> {
    vault
        .add_category(name)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "{} Category '{}' created",
        style("•").green().bold(),
        name.trim()
    );
    Ok(())
}

/// Delete a custom category and reassign its prompts to the fallback.
pub async fn rm(vault: &PromptVault, name: &str) -> Result<(), String> {
    if STANDARD_CATEGORIES.contains(&name) {
        return Err(format!("Category '{}' is built in and cannot be deleted", name));
    }
    if !vault.custom_categories().await.iter().any(|c| c == name) {
        return Err(format!("No custom category named '{}'", name));
    }

    let reassigned = vault.delete_category(name).await;
    if reassigned == 0 {
        println!(
            "{} Category '{}' deleted",
            style("•").green().bold(),
            name
        );
    } else {
        println!(
            "{} Category '{}' deleted; {} prompt(s) moved to 'Misc'",
            style("•").green().bold(),
            name,
            reassigned
        );
    }
    Ok(())
}

/// List categories, built-in first, custom ones marked.
pub async fn ls(vault: &PromptVault) -> Result<(), String> {
    let custom = vault.custom_categories().await;
    println!("{}", style("Categories:").green().bold());
    for name in STANDARD_CATEGORIES {
        println!("  {} {}", style("•").green(), name);
    }
    for name in &custom {
        println!(
            "  {} {} {}",
            style("•").green(),
            name,
            style("(custom)").dim()
        );
    }
    Ok(())
}
