use console::style;
use dialoguer::{theme::ColorfulTheme, Editor, Input, Select};

use crate::api::PromptVault;
use crate::core::prompt::{Example, PromptConfig, PromptPatch, PromptStatus};

/// Edit a prompt's fields through a menu loop; substantive changes get a
/// version snapshot on save.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    let theme = ColorfulTheme::default();
    let mut patch = PromptPatch::default();
    let mut changed = false;

    loop {
        let selections = &[
            "Edit Content",
            "Edit Title",
            "Edit Description",
            "Edit System Instruction",
            "Edit Examples",
            "Edit Config",
            "Edit Tags",
            "Change Category",
            "Change Status",
            "Finish Editing",
        ];
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .default(0)
            .items(&selections[..])
            .interact()
            .map_err(|e| e.to_string())?;

        match selection {
            0 => {
                let current = patch.content.as_deref().unwrap_or(&p.content);
                let edited = Editor::new()
                    .edit(current)
                    .map_err(|e| format!("Editor error: {}", e))?
                    .unwrap_or_default();
                patch.content = Some(edited);
                changed = true;
                println!("{}", style("Content updated.").green());
            }
            1 => {
                let current = patch.title.clone().unwrap_or_else(|| p.title.clone());
                let title: String = Input::with_theme(&theme)
                    .with_prompt("Title")
                    .with_initial_text(current)
                    .interact_text()
                    .map_err(|e| format!("Title error: {}", e))?;
                if title.trim().is_empty() {
                    return Err("Title cannot be empty".to_string());
                }
                patch.title = Some(title);
                changed = true;
                println!("{}", style("Title updated.").green());
            }
            2 => {
                let current = patch
                    .description
                    .clone()
                    .unwrap_or_else(|| p.description.clone());
                let description: String = Input::with_theme(&theme)
                    .with_prompt("Description")
                    .with_initial_text(current)
                    .allow_empty(true)
                    .interact_text()
                    .map_err(|e| format!("Description error: {}", e))?;
                patch.description = Some(description);
                changed = true;
                println!("{}", style("Description updated.").green());
            }
            3 => {
                let current = patch
                    .system_instruction
                    .clone()
                    .or_else(|| p.system_instruction.clone())
                    .unwrap_or_default();
                let edited = Editor::new()
                    .edit(&current)
                    .map_err(|e| format!("Editor error: {}", e))?
                    .unwrap_or_default();
                if edited.trim().is_empty() {
                    patch.system_instruction = Some(String::new());
                    println!("{}", style("System instruction cleared.").yellow());
                } else {
                    patch.system_instruction = Some(edited);
                    println!("{}", style("System instruction updated.").green());
                }
                changed = true;
            }
            4 => {
                let current = patch.examples.as_ref().unwrap_or(&p.examples);
                let current_str = serde_json::to_string_pretty(current)
                    .unwrap_or_else(|_| "[]".to_string());
                let edited = Editor::new()
                    .edit(&current_str)
                    .map_err(|e| format!("Editor error: {}", e))?
                    .unwrap_or_default();
                if edited.trim().is_empty() {
                    patch.examples = Some(Vec::new());
                    println!("{}", style("Examples removed.").yellow());
                } else {
                    let examples: Vec<Example> = serde_json::from_str(&edited)
                        .map_err(|e| format!("Invalid JSON in examples: {}", e))?;
                    patch.examples = Some(examples);
                    println!("{}", style("Examples updated.").green());
                }
                changed = true;
            }
            5 => {
                let current = patch.config.as_ref().unwrap_or(&p.config);
                let current_str = serde_json::to_string_pretty(current)
                    .unwrap_or_else(|_| "{}".to_string());
                let edited = Editor::new()
                    .edit(&current_str)
                    .map_err(|e| format!("Editor error: {}", e))?
                    .unwrap_or_default();
                if !edited.trim().is_empty() {
                    let config: PromptConfig = serde_json::from_str(&edited)
                        .map_err(|e| format!("Invalid JSON in config: {}", e))?;
                    patch.config = Some(config);
                    changed = true;
                    println!("{}", style("Config updated.").green());
                }
            }
            6 => {
                let current = patch
                    .tags
                    .clone()
                    .unwrap_or_else(|| p.tags.clone())
                    .join(", ");
                let tags_line: String = Input::with_theme(&theme)
                    .with_prompt("Tags (comma-separated)")
                    .with_initial_text(current)
                    .allow_empty(true)
                    .interact_text()
                    .map_err(|e| format!("Tags error: {}", e))?;
                patch.tags = Some(
                    tags_line
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
                changed = true;
                println!("{}", style("Tags updated.").green());
            }
            7 => {
                let choices = vault.categories().await;
                let current = patch.category.as_deref().unwrap_or(&p.category);
                let default = choices.iter().position(|c| c == current).unwrap_or(0);
                let picked = Select::with_theme(&theme)
                    .with_prompt("Category")
                    .default(default)
                    .items(&choices)
                    .interact()
                    .map_err(|e| format!("Category error: {}", e))?;
                patch.category = Some(choices[picked].clone());
                changed = true;
                println!("{}", style("Category updated.").green());
            }
            8 => {
                let choices = &["active", "draft", "archived"];
                let picked = Select::with_theme(&theme)
                    .with_prompt("Status")
                    .default(0)
                    .items(&choices[..])
                    .interact()
                    .map_err(|e| format!("Status error: {}", e))?;
                patch.status = Some(match picked {
                    0 => PromptStatus::Active,
                    1 => PromptStatus::Draft,
                    _ => PromptStatus::Archived,
                });
                changed = true;
                println!("{}", style("Status updated.").green());
            }
            _ => break,
        }
    }

    if !changed {
        println!("{}", style("No changes detected. Nothing to save.").yellow());
        return Ok(());
    }

    vault
        .update(&p.id, patch)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "{} Prompt '{}' updated successfully.",
        style("✔").green().bold(),
        p.title
    );
    Ok(())
}
