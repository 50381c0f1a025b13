use console::style;
use std::fs;

use crate::api::PromptVault;

/// Export prompts to a JSON backup file.
pub async fn run(vault: &PromptVault, ids: Option<&str>, out_path: &str) -> Result<(), String> {
    let wanted: Option<Vec<String>> = ids.map(|s| {
        s.split(',')
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect()
    });

    let bundle = vault
        .export(wanted.as_deref())
        .await
        .map_err(|e| e.to_string())?;

    if bundle.is_empty() {
        println!("{}", style("Nothing to export").yellow());
        return Ok(());
    }

    let serialized =
        serde_json::to_string_pretty(&bundle).map_err(|e| format!("Serialize error: {}", e))?;
    fs::write(out_path, serialized).map_err(|e| format!("Write error: {}", e))?;

    println!(
        "{} {} prompt(s) exported to {}",
        style("•").green().bold(),
        bundle.len(),
        out_path
    );
    Ok(())
}
