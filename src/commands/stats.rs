use console::style;
use std::collections::HashMap;

use crate::api::PromptVault;

/// Display statistics about the vault.
pub async fn run(vault: &PromptVault) -> Result<(), String> {
    let prompts = vault.prompts().await;

    let total = prompts.len();
    let trashed = prompts.iter().filter(|p| p.is_trashed()).count();
    let live = total - trashed;
    let favorites = prompts
        .iter()
        .filter(|p| !p.is_trashed() && p.is_favorite)
        .count();
    let versions: usize = prompts.iter().map(|p| p.history.len()).sum();
    let runs: usize = prompts.iter().map(|p| p.saved_runs.len()).sum();

    let mut category_counts: HashMap<&str, usize> = HashMap::new();
    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for p in prompts.iter().filter(|p| !p.is_trashed()) {
        *category_counts.entry(p.category.as_str()).or_insert(0) += 1;
        for tag in &p.tags {
            *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    println!("{}", style("Prompt Vault Statistics").bold().underlined());
    println!("{}: {}", style("Prompts").cyan(), style(live).yellow());
    println!("{}: {}", style("In Trash").cyan(), style(trashed).yellow());
    println!("{}: {}", style("Favorites").cyan(), style(favorites).yellow());
    println!(
        "{}: {}",
        style("Version Snapshots").cyan(),
        style(versions).yellow()
    );
    println!("{}: {}", style("Saved Runs").cyan(), style(runs).yellow());

    if !category_counts.is_empty() {
        let mut sorted: Vec<_> = category_counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        println!("\n{}", style("By Category:").bold().underlined());
        for (category, count) in sorted {
            println!("  - {} ({})", style(category).green(), count);
        }
    }

    if !tag_counts.is_empty() {
        let mut sorted: Vec<_> = tag_counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        println!("\n{}", style("Top Tags:").bold().underlined());
        for (tag, count) in sorted.iter().take(10) {
            println!("  - {} ({})", style(tag).green(), count);
        }
    }

    Ok(())
}
