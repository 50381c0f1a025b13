use console::style;
use copypasta::{ClipboardContext, ClipboardProvider};

use crate::api::PromptVault;

/// Copy prompt content to clipboard.
pub async fn run(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;

    let mut ctx_clip = ClipboardContext::new().map_err(|e| format!("Clipboard error: {}", e))?;
    ctx_clip
        .set_contents(p.content.clone())
        .map_err(|e| format!("Clipboard set error: {}", e))?;

    println!(
        "{} '{}' copied to clipboard",
        style("•").green().bold(),
        p.title
    );
    Ok(())
}
