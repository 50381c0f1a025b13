use console::style;

use crate::api::PromptVault;

/// Flush pending writes and report sync health. Exits nonzero while a
/// store is failing so scripts can notice.
pub async fn run(vault: &PromptVault) -> Result<(), String> {
    match vault.sync_now().await {
        None => {
            println!("{} All changes synced", style("•").green().bold());
            Ok(())
        }
        Some(error) => Err(format!("Sync failing: {}", error)),
    }
}
