use console::style;

use crate::api::PromptVault;
use crate::core::prompt::RunRating;
use crate::core::utils::format_millis;

/// List a prompt's saved runs, newest first.
pub async fn ls(vault: &PromptVault, id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;

    if p.saved_runs.is_empty() {
        println!("{}", style("No saved runs").yellow());
        return Ok(());
    }

    println!(
        "{}",
        style(format!("Saved runs of '{}' (newest first):", p.title))
            .green()
            .bold()
    );
    for run in &p.saved_runs {
        let verdict = match run.rating {
            Some(RunRating::Good) => style("good").green().to_string(),
            Some(RunRating::Bad) => style("bad").red().to_string(),
            None => style("unrated").dim().to_string(),
        };
        let preview = run.output.lines().next().unwrap_or("");
        let preview = if preview.chars().count() > 60 {
            let cut: String = preview.chars().take(60).collect();
            format!("{}...", cut)
        } else {
            preview.to_string()
        };
        println!(
            "  {} {} {} [{}] {}",
            style(&run.id).yellow(),
            format_millis(run.timestamp),
            run.model,
            verdict,
            style(preview).dim()
        );
    }
    Ok(())
}

/// Rate a saved run 'good' or 'bad'.
pub async fn rate(vault: &PromptVault, id: &str, run_id: &str, rating: &str) -> Result<(), String> {
    let verdict = match rating.to_lowercase().as_str() {
        "good" => RunRating::Good,
        "bad" => RunRating::Bad,
        other => return Err(format!("Unknown rating '{}'. Use 'good' or 'bad'", other)),
    };

    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    vault
        .rate_run(&p.id, run_id, verdict)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "{} Run {} rated {}",
        style("•").green().bold(),
        style(run_id).yellow(),
        rating.to_lowercase()
    );
    Ok(())
}

/// Delete a saved run.
pub async fn rm(vault: &PromptVault, id: &str, run_id: &str) -> Result<(), String> {
    let p = vault.find(id).await.map_err(|e| e.to_string())?;
    vault
        .delete_run(&p.id, run_id)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "{} Run {} deleted",
        style("•").green().bold(),
        style(run_id).yellow()
    );
    Ok(())
}
