use crate::api::PromptVault;
use crate::cli::{CategoryCmd, Cmd, RunsCmd, ThemeCmd};
use crate::core::config::VaultConfig;

pub mod category;
pub mod copy;
pub mod delete;
pub mod duplicate;
pub mod edit;
pub mod export;
pub mod favorite;
pub mod get;
pub mod history;
pub mod import;
pub mod list;
pub mod new;
pub mod purge;
pub mod restore;
pub mod run;
pub mod runs;
pub mod search;
pub mod stats;
pub mod sync;
pub mod tag;
pub mod theme;

/// Dispatches the parsed command to the appropriate handler.
pub async fn dispatch(
    command: Cmd,
    vault: &PromptVault,
    config: &VaultConfig,
) -> Result<(), String> {
    match command {
        Cmd::List {
            category,
            tag,
            search,
            favorites,
            recent,
            sort,
            asc,
            clear,
            more,
        } => {
            list::run(
                vault,
                list::Options {
                    category,
                    tag,
                    search,
                    favorites,
                    recent,
                    sort,
                    asc,
                    clear,
                    more,
                },
            )
            .await
        }
        Cmd::New {
            title,
            content,
            category,
            tags,
            description,
        } => new::run(vault, title, content, category, tags, description).await,
        Cmd::Get { id } => get::run(vault, &id).await,
        Cmd::Edit { id } => edit::run(vault, &id).await,
        Cmd::Delete { id } => delete::run(vault, &id).await,
        Cmd::Restore { id } => restore::run(vault, &id).await,
        Cmd::Purge { id, yes } => purge::run(vault, &id, yes).await,
        Cmd::Duplicate { id } => duplicate::run(vault, &id).await,
        Cmd::Favorite { id } => favorite::run(vault, &id).await,
        Cmd::Tag { id, changes } => tag::run(vault, &id, &changes).await,
        Cmd::Category(category_cmd) => match category_cmd {
            CategoryCmd::Add { name } => category::add(vault, &name).await,
            CategoryCmd::Rm { name } => category::rm(vault, &name).await,
            CategoryCmd::Ls => category::ls(vault).await,
        },
        Cmd::Search { query } => search::run(vault, &query).await,
        Cmd::History { id } => history::run(vault, &id).await,
        Cmd::Run {
            id,
            provider,
            backend,
            model,
            vars,
            stream,
            no_record,
        } => {
            run::run(
                vault,
                config,
                run::Options {
                    id,
                    provider,
                    backend,
                    model,
                    vars,
                    stream,
                    no_record,
                },
            )
            .await
        }
        Cmd::Runs(runs_cmd) => match runs_cmd {
            RunsCmd::Ls { id } => runs::ls(vault, &id).await,
            RunsCmd::Rate { id, run_id, rating } => runs::rate(vault, &id, &run_id, &rating).await,
            RunsCmd::Rm { id, run_id } => runs::rm(vault, &id, &run_id).await,
        },
        Cmd::Copy { id } => copy::run(vault, &id).await,
        Cmd::Import { file } => import::run(vault, &file).await,
        Cmd::Export { ids, out } => export::run(vault, ids.as_deref(), &out).await,
        Cmd::Stats => stats::run(vault).await,
        Cmd::Theme(theme_cmd) => match theme_cmd {
            ThemeCmd::Get => theme::get(vault).await,
            ThemeCmd::Set { name } => theme::set(vault, &name).await,
        },
        Cmd::Sync => sync::run(vault).await,
    }
}
