use clap::Parser;
use prompt_vault::cli::Cli;
use prompt_vault::commands;
use prompt_vault::core::config::VaultConfig;
use prompt_vault::core::store::VaultPaths;
use prompt_vault::PromptVault;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("• {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let paths = VaultPaths::resolve().map_err(|e| e.to_string())?;
    let config = VaultConfig::load(&paths.config_path)?;

    let mut vault = PromptVault::open_at(&paths, config.sync.clone())
        .await
        .map_err(|e| e.to_string())?;
    vault.start().await;

    // Close even when the command failed; whatever it changed before the
    // error still reaches disk.
    let result = commands::dispatch(cli.command, &vault, &config).await;
    vault.close().await;
    result
}
