use console::style;

use crate::api::PromptVault;
use crate::core::prompt::PromptStatus;
use crate::core::utils::format_millis;

/// Display a prompt.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;

    let mut headline = p.title.clone();
    if p.is_favorite {
        headline.push_str(" ★");
    }
    println!("{} {}", style("Title:").green().bold(), headline);
    println!("{} {}", style("ID:").green().bold(), style(&p.id).yellow());
    println!("{} {}", style("Category:").green().bold(), p.category);
    if !p.tags.is_empty() {
        println!("{} {}", style("Tags:").green().bold(), p.tags.join(", "));
    }
    let status = match p.status {
        PromptStatus::Active => "active",
        PromptStatus::Draft => "draft",
        PromptStatus::Archived => "archived",
    };
    println!("{} {}", style("Status:").green().bold(), status);
    if p.is_trashed() {
        println!("{}", style("In trash (use 'restore' to bring it back)").red());
    }
    if !p.description.is_empty() {
        println!("{} {}", style("Description:").green().bold(), p.description);
    }
    if let Some(system) = &p.system_instruction {
        println!("{} {}", style("System:").green().bold(), system);
    }
    if !p.examples.is_empty() {
        println!(
            "{} {}",
            style("Examples:").green().bold(),
            p.examples.len()
        );
    }
    if !p.config.model.is_empty() {
        println!(
            "{} {} (temp {}, max {} tokens)",
            style("Model:").green().bold(),
            p.config.model,
            p.config.temperature,
            p.config.max_tokens
        );
    }
    println!(
        "{} {}  {} {}",
        style("Created:").green().bold(),
        format_millis(p.created_at),
        style("Updated:").green().bold(),
        format_millis(p.updated_at)
    );
    if !p.history.is_empty() || !p.saved_runs.is_empty() {
        println!(
            "{} {} versions, {} saved runs",
            style("History:").green().bold(),
            p.history.len(),
            p.saved_runs.len()
        );
    }
    println!("{}", style("Content:").green().bold());
    println!("{}", p.content);
    Ok(())
}
