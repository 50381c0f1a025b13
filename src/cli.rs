//! Defines the command-line interface structure using clap.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "prompt-vault", version, about = "Local prompt library manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// List prompts through the persisted view (filters, sort, pagination)
    List {
        #[arg(long, help = "Filter by category name, or 'all' / 'trash'")]
        category: Option<String>,
        #[arg(long, help = "Filter by a single tag")]
        tag: Option<String>,
        #[arg(long, help = "Full-text search over title, description, content, and tags")]
        search: Option<String>,
        #[arg(long, help = "Only favorites")]
        favorites: bool,
        #[arg(long, help = "Only prompts touched in the last 30 days")]
        recent: bool,
        #[arg(long, help = "Sort key: 'created', 'title', or 'category'")]
        sort: Option<String>,
        #[arg(long, help = "Sort ascending (with --sort; default is descending)")]
        asc: bool,
        #[arg(long, help = "Reset every filter to its default first")]
        clear: bool,
        #[arg(long, help = "Reveal one more page of the current view")]
        more: bool,
    },
    /// Create a new prompt
    New {
        #[arg(long, help = "Title (prompts interactively when omitted)")]
        title: Option<String>,
        #[arg(long, help = "Content (opens an editor when omitted)")]
        content: Option<String>,
        #[arg(long, help = "Category (defaults to 'General')")]
        category: Option<String>,
        #[arg(long = "tag", help = "Tag to attach (repeatable)")]
        tags: Vec<String>,
        #[arg(long, help = "Short description")]
        description: Option<String>,
    },
    /// Display a prompt by ID or title
    Get { id: String },
    /// Edit an existing prompt interactively
    Edit { id: String },
    /// Move a prompt to the trash
    Delete { id: String },
    /// Restore a prompt from the trash
    Restore { id: String },
    /// Permanently delete a trashed prompt
    Purge {
        id: String,
        #[arg(long, help = "Skip the confirmation question")]
        yes: bool,
    },
    /// Duplicate a prompt under a fresh identity
    Duplicate { id: String },
    /// Toggle a prompt's favorite flag
    Favorite { id: String },
    /// Add or remove tags: 'tag ID +rust -draft' adds 'rust', removes 'draft'
    Tag { id: String, changes: Vec<String> },
    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCmd),
    /// Search prompts without touching the persisted view
    Search { query: String },
    /// Show a prompt's version history
    History { id: String },
    /// Execute a prompt against an LLM and record the result
    Run {
        /// ID or title of the prompt to execute
        id: String,
        /// Named provider from config.toml (defaults to the default provider)
        #[arg(long)]
        provider: Option<String>,
        /// Ad-hoc backend, e.g. 'openai:gpt-4o-mini'; overrides --provider
        #[arg(long)]
        backend: Option<String>,
        /// Model override for this run
        #[arg(long)]
        model: Option<String>,
        /// Variable assignments in key=value format
        #[arg(long = "var")]
        vars: Vec<String>,
        /// Print the response incrementally as it arrives
        #[arg(long)]
        stream: bool,
        /// Do not save the result to the prompt's run list
        #[arg(long)]
        no_record: bool,
    },
    /// Manage saved test runs
    #[command(subcommand)]
    Runs(RunsCmd),
    /// Copy a prompt's content to the clipboard
    Copy { id: String },
    /// Import prompts from a JSON backup file
    Import { file: String },
    /// Export prompts to a JSON backup file
    Export {
        #[arg(long, help = "Comma-separated list of prompt IDs to export")]
        ids: Option<String>,
        #[arg(long, help = "Output file path")]
        out: String,
    },
    /// Show vault statistics
    Stats,
    /// Show or change the UI theme
    #[command(subcommand)]
    Theme(ThemeCmd),
    /// Flush pending writes and report sync health
    Sync,
}

#[derive(Subcommand)]
pub enum CategoryCmd {
    /// Create a custom category
    Add { name: String },
    /// Delete a custom category, reassigning its prompts to 'Misc'
    Rm { name: String },
    /// List categories (built-in and custom)
    Ls,
}

#[derive(Subcommand)]
pub enum RunsCmd {
    /// List a prompt's saved runs
    Ls { id: String },
    /// Rate a saved run 'good' or 'bad'
    Rate {
        id: String,
        run_id: String,
        rating: String,
    },
    /// Delete a saved run
    Rm { id: String, run_id: String },
}

#[derive(Subcommand)]
pub enum ThemeCmd {
    /// Print the active theme
    Get,
    /// Set the theme: 'light', 'dark', or 'system'
    Set { name: String },
}
