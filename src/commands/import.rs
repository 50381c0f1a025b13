use console::style;
use std::fs;

use crate::api::PromptVault;
use crate::core::prompt::Prompt;

/// Import prompts from a JSON backup file.
pub async fn run(vault: &PromptVault, file: &str) -> Result<(), String> {
    let contents = fs::read_to_string(file).map_err(|e| format!("Read error: {}", e))?;
    let incoming: Vec<Prompt> =
        serde_json::from_str(&contents).map_err(|e| format!("Invalid JSON: {}", e))?;

    if incoming.is_empty() {
        println!("{}", style("Nothing to import").yellow());
        return Ok(());
    }

    let report = vault.import(incoming).await;

    println!(
        "{} {} prompt(s) imported",
        style("•").green().bold(),
        report.imported
    );
    if !report.skipped.is_empty() {
        println!(
            "{} {} record(s) skipped:",
            style("•").yellow().bold(),
            report.skipped.len()
        );
        for skip in &report.skipped {
            println!(
                "  {} #{} '{}': {}",
                style("-").dim(),
                skip.index + 1,
                skip.label,
                skip.reason
            );
        }
    }
    Ok(())
}
