use console::style;

use crate::api::PromptVault;
use crate::core::filter::{ViewQuery, PAGE_SIZE};

/// One-off search over the live library. Does not touch the persisted view.
pub async fn run(vault: &PromptVault, query: &str) -> Result<(), String> {
    let view_query = ViewQuery {
        search: query.to_string(),
        ..Default::default()
    };
    // Enough pages to show every match.
    let pages = vault.prompts().await.len() / PAGE_SIZE + 1;
    let page = vault.query(&view_query, pages).await;

    if page.items.is_empty() {
        println!("{}", style("No match").yellow());
        return Ok(());
    }

    println!("{}", style("Matches:").green().bold());
    for p in &page.items {
        println!(
            "  {} {} - {}",
            style("•").green(),
            style(&p.id).yellow(),
            p.title
        );
    }
    Ok(())
}
