use console::style;

use crate::api::PromptVault;

const THEMES: [&str; 3] = ["light", "dark", "system"];

/// Print the active theme.
pub async fn get(vault: &PromptVault) -> Result<(), String> {
    println!("{}", vault.theme().await);
    Ok(())
}

/// Change the theme.
pub async fn set(vault: &PromptVault, name: &str) -> Result<(), String> {
    let name = name.to_lowercase();
    if !THEMES.contains(&name.as_str()) {
        return Err(format!(
            "Unknown theme '{}'. Use 'light', 'dark', or 'system'",
            name
        ));
    }
    vault.set_theme(name.clone()).await;
    println!("{} Theme set to {}", style("•").green().bold(), name);
    Ok(())
}
