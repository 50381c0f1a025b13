use console::style;

use crate::api::PromptVault;
use crate::core::utils::format_millis;

/// Show a prompt's version history, newest first.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;

    if p.history.is_empty() {
        println!("{}", style("No version history").yellow());
        return Ok(());
    }

    println!(
        "{}",
        style(format!("History of '{}' (newest first):", p.title))
            .green()
            .bold()
    );
    for (i, version) in p.history.iter().enumerate() {
        let preview = version.content.lines().next().unwrap_or("");
        let preview = if preview.chars().count() > 60 {
            let cut: String = preview.chars().take(60).collect();
            format!("{}...", cut)
        } else {
            preview.to_string()
        };
        println!(
            "  {} {} {} {}",
            style(format!("#{}", i + 1)).yellow(),
            format_millis(version.timestamp),
            style(&version.title).bold(),
            style(preview).dim()
        );
    }
    Ok(())
}
