use console::style;
use dialoguer::{theme::ColorfulTheme, Editor, Input, Select};

use crate::api::PromptVault;
use crate::core::prompt::PromptPatch;

/// Create a new prompt. Flags fill fields up front; anything essential left
/// out is asked for interactively.
pub async fn run(
    vault: &PromptVault,
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    description: Option<String>,
) -> Result<(), String> {
    let theme = ColorfulTheme::default();

    let title = match title {
        Some(t) => t,
        None => Input::with_theme(&theme)
            .with_prompt("Title")
            .interact_text()
            .map_err(|e| format!("Title error: {}", e))?,
    };
    if title.trim().is_empty() {
        return Err("Title cannot be empty".to_string());
    }

    let content = match content {
        Some(c) => c,
        None => Editor::new()
            .edit("Enter your prompt content here.")
            .map_err(|e| format!("Editor error: {}", e))?
            .unwrap_or_default(),
    };

    let category = match category {
        Some(c) => {
            let known = vault.categories().await;
            if !known.iter().any(|k| k == &c) {
                return Err(format!(
                    "Unknown category '{}'. Use 'category ls' to see them, or 'category add'",
                    c
                ));
            }
            c
        }
        None => {
            let choices = vault.categories().await;
            let default = choices.iter().position(|c| c == "General").unwrap_or(0);
            let picked = Select::with_theme(&theme)
                .with_prompt("Category")
                .default(default)
                .items(&choices)
                .interact()
                .map_err(|e| format!("Category error: {}", e))?;
            choices[picked].clone()
        }
    };

    let tags = if tags.is_empty() {
        let tags_line: String = Input::with_theme(&theme)
            .with_prompt("Tags (comma-separated, optional)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| format!("Tags error: {}", e))?;
        tags_line
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        tags
    };

    let prompt = vault
        .create(PromptPatch {
            title: Some(title.clone()),
            content: Some(content),
            category: Some(category),
            tags: Some(tags),
            description,
            ..Default::default()
        })
        .await;

    println!(
        "{} Prompt saved with ID {} and title '{}'",
        style("•").green().bold(),
        style(&prompt.id).yellow(),
        title
    );
    Ok(())
}
