use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::api::StoreError;
use crate::core::filter::PromptView;
use crate::core::prompt::Prompt;
use crate::core::utils::ensure_dir;

const PROMPTS_FILE: &str = "prompts.json";
const CATEGORIES_FILE: &str = "categories.json";
const THEME_FILE: &str = "theme";
const FILTERS_FILE: &str = "filters.json";

/// Uniform persistence surface. The library talks to every store through
/// this trait; swapping the backing medium never touches callers.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Full prompt list, stored order preserved. An absent store reads as
    /// an empty list.
    async fn get_prompts(&self) -> Result<Vec<Prompt>, StoreError>;

    /// Overwrite the full prompt list.
    async fn save_prompts(&self, prompts: &[Prompt]) -> Result<(), StoreError>;

    /// Custom (user-created) category names.
    async fn get_categories(&self) -> Result<Vec<String>, StoreError>;

    async fn save_categories(&self, categories: &[String]) -> Result<(), StoreError>;

    /// Theme identifier, `None` when never set.
    async fn get_theme(&self) -> Result<Option<String>, StoreError>;

    async fn save_theme(&self, theme: &str) -> Result<(), StoreError>;

    /// Last persisted view state, `None` when never saved.
    async fn get_filter_state(&self) -> Result<Option<PromptView>, StoreError>;

    async fn save_filter_state(&self, view: &PromptView) -> Result<(), StoreError>;
}

/// Filesystem layout of a vault.
pub struct VaultPaths {
    pub base_dir: PathBuf,
    pub primary_dir: PathBuf,
    pub replica_dir: PathBuf,
    pub config_path: PathBuf,
}

impl VaultPaths {
    /// Resolve `~/.prompt-vault` (or `$PROMPT_VAULT_DIR`) and create the
    /// store directories.
    pub fn resolve() -> Result<Self, StoreError> {
        let base_dir = match env::var("PROMPT_VAULT_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = env::var("HOME").map_err(|_| {
                    StoreError::Init("Unable to determine HOME directory".to_string())
                })?;
                PathBuf::from(home).join(".prompt-vault")
            }
        };
        Self::under(base_dir)
    }

    /// Same layout rooted at an explicit directory.
    pub fn under(base_dir: PathBuf) -> Result<Self, StoreError> {
        let primary_dir = base_dir.join("store");
        let replica_dir = base_dir.join("replica");
        let config_path = base_dir.join("config.toml");

        ensure_dir(&base_dir).map_err(StoreError::Init)?;
        ensure_dir(&primary_dir).map_err(StoreError::Init)?;
        ensure_dir(&replica_dir).map_err(StoreError::Init)?;

        Ok(Self {
            base_dir,
            primary_dir,
            replica_dir,
            config_path,
        })
    }
}

/// JSON-file store rooted at one directory. Writes go through a temp file
/// and a rename so a crash never leaves a half-written document behind.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_dir(&dir).map_err(StoreError::Init)?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn read_text(&self, name: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path(name)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, name: &str, contents: &str) -> Result<(), StoreError> {
        let tmp = self.path(&format!("{}.tmp", name));
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, self.path(name)).await?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.read_text(name).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(value)?;
        self.write_atomic(name, &text).await
    }
}

#[async_trait]
impl StorageAdapter for JsonStore {
    async fn get_prompts(&self) -> Result<Vec<Prompt>, StoreError> {
        Ok(self.read_json(PROMPTS_FILE).await?.unwrap_or_default())
    }

    async fn save_prompts(&self, prompts: &[Prompt]) -> Result<(), StoreError> {
        self.write_json(PROMPTS_FILE, &prompts).await
    }

    async fn get_categories(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_json(CATEGORIES_FILE).await?.unwrap_or_default())
    }

    async fn save_categories(&self, categories: &[String]) -> Result<(), StoreError> {
        self.write_json(CATEGORIES_FILE, &categories).await
    }

    async fn get_theme(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .read_text(THEME_FILE)
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn save_theme(&self, theme: &str) -> Result<(), StoreError> {
        self.write_atomic(THEME_FILE, theme).await
    }

    async fn get_filter_state(&self) -> Result<Option<PromptView>, StoreError> {
        self.read_json(FILTERS_FILE).await
    }

    async fn save_filter_state(&self, view: &PromptView) -> Result<(), StoreError> {
        self.write_json(FILTERS_FILE, view).await
    }
}

#[derive(Default)]
struct MemoryState {
    prompts: Vec<Prompt>,
    categories: Vec<String>,
    theme: Option<String>,
    filters: Option<PromptView>,
}

/// In-memory store. Plays the replica role where no real secondary engine
/// exists, and doubles as the test stand-in for either side. Write counts
/// and a switchable outage mode let tests observe coalescing and failure
/// handling.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
    prompt_saves: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Init("memory store mutex poisoned".to_string()))
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "store offline",
            )));
        }
        Ok(())
    }

    /// Times `save_prompts` has been called.
    pub fn prompt_save_count(&self) -> usize {
        self.prompt_saves.load(Ordering::SeqCst)
    }

    /// Simulate an outage: while set, every write fails and leaves the
    /// stored data untouched.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn get_prompts(&self) -> Result<Vec<Prompt>, StoreError> {
        Ok(self.state()?.prompts.clone())
    }

    async fn save_prompts(&self, prompts: &[Prompt]) -> Result<(), StoreError> {
        self.check_online()?;
        self.prompt_saves.fetch_add(1, Ordering::SeqCst);
        self.state()?.prompts = prompts.to_vec();
        Ok(())
    }

    async fn get_categories(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state()?.categories.clone())
    }

    async fn save_categories(&self, categories: &[String]) -> Result<(), StoreError> {
        self.check_online()?;
        self.state()?.categories = categories.to_vec();
        Ok(())
    }

    async fn get_theme(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state()?.theme.clone())
    }

    async fn save_theme(&self, theme: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.state()?.theme = Some(theme.to_string());
        Ok(())
    }

    async fn get_filter_state(&self) -> Result<Option<PromptView>, StoreError> {
        Ok(self.state()?.filters.clone())
    }

    async fn save_filter_state(&self, view: &PromptView) -> Result<(), StoreError> {
        self.check_online()?;
        self.state()?.filters = Some(view.clone());
        Ok(())
    }
}
