use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version snapshots kept per prompt, newest first.
pub const HISTORY_LIMIT: usize = 10;

/// Saved test runs kept per prompt, newest first.
pub const SAVED_RUN_LIMIT: usize = 20;

/// Built-in categories. Always present, never deletable.
pub const STANDARD_CATEGORIES: [&str; 7] = [
    "General",
    "Writing",
    "Coding",
    "Translation",
    "Analysis",
    "Roleplay",
    "Misc",
];

/// Category that orphaned prompts fall back to when their category is deleted.
pub const FALLBACK_CATEGORY: &str = "Misc";

/// Title suffix applied when a prompt is duplicated.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Window for the "recently touched" filter, in milliseconds (30 days).
pub const RECENT_WINDOW_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Lifecycle state of a prompt. Independent of trash status, which is
/// tracked by `deleted_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

/// User verdict on a saved run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunRating {
    Good,
    Bad,
}

/// Few-shot example attached to a prompt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
}

/// Execution parameters for test runs. Compared structurally when deciding
/// whether an edit deserves a version snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

/// Immutable snapshot of a prompt's substantive fields as they existed
/// right before an edit replaced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptVersion {
    pub timestamp: i64,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub config: PromptConfig,
}

/// One recorded test execution, newest kept at the front of `saved_runs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRun {
    pub id: String,
    pub timestamp: i64,
    pub model: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RunRating>,
}

/// A stored prompt record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chinese_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_scene: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub config: PromptConfig,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub collected_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub status: PromptStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<PromptVersion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saved_runs: Vec<SavedRun>,
}

fn default_category() -> String {
    "General".to_string()
}

/// Partial update for a prompt. `None` fields are left untouched; optional
/// text fields are cleared by passing an empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub system_instruction: Option<String>,
    pub english_prompt: Option<String>,
    pub chinese_prompt: Option<String>,
    pub examples: Option<Vec<Example>>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub output_type: Option<String>,
    pub application_scene: Option<String>,
    pub labels: Option<Vec<String>>,
    pub config: Option<PromptConfig>,
    pub status: Option<PromptStatus>,
    pub is_favorite: Option<bool>,
}

impl PromptPatch {
    /// Builder-style patch with just a title, handy in tests and command glue.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

fn normalize(text: Option<&String>) -> Option<&str> {
    match text {
        Some(s) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

impl Prompt {
    /// Build a fresh record from creation input. Empty titles fall back to
    /// "Untitled" so a record is never unrenderable.
    pub fn from_patch(id: String, patch: PromptPatch, now: i64) -> Self {
        let mut prompt = Prompt {
            id,
            title: "Untitled".to_string(),
            description: String::new(),
            content: String::new(),
            system_instruction: None,
            english_prompt: None,
            chinese_prompt: None,
            examples: Vec::new(),
            category: default_category(),
            tags: Vec::new(),
            output_type: None,
            application_scene: None,
            labels: Vec::new(),
            config: PromptConfig::default(),
            created_at: now,
            updated_at: now,
            collected_at: now,
            deleted_at: None,
            is_favorite: false,
            status: PromptStatus::Active,
            history: Vec::new(),
            saved_runs: Vec::new(),
        };
        prompt.merge(patch);
        if prompt.title.is_empty() {
            prompt.title = "Untitled".to_string();
        }
        prompt.updated_at = now;
        prompt
    }

    /// True when the record sits in the trash.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Timestamp used by the recency filter.
    pub fn last_touched(&self) -> i64 {
        if self.updated_at > 0 {
            self.updated_at
        } else {
            self.created_at
        }
    }

    /// Whether applying `patch` would change a substantive field: content,
    /// system instruction, examples, or execution config. Metadata-only
    /// changes (title, tags, category, ...) report false.
    pub fn would_snapshot(&self, patch: &PromptPatch) -> bool {
        if let Some(content) = &patch.content {
            if *content != self.content {
                return true;
            }
        }
        if patch.system_instruction.is_some()
            && normalize(patch.system_instruction.as_ref())
                != normalize(self.system_instruction.as_ref())
        {
            return true;
        }
        if let Some(examples) = &patch.examples {
            if *examples != self.examples {
                return true;
            }
        }
        if let Some(config) = &patch.config {
            if *config != self.config {
                return true;
            }
        }
        false
    }

    /// Snapshot of the substantive fields as they stand right now, stamped
    /// with the moment the replacing edit happens.
    pub fn version_snapshot(&self, now: i64) -> PromptVersion {
        PromptVersion {
            timestamp: now,
            title: self.title.clone(),
            content: self.content.clone(),
            system_instruction: self.system_instruction.clone(),
            examples: self.examples.clone(),
            config: self.config.clone(),
        }
    }

    /// Push a snapshot at the head of the history, dropping the oldest
    /// entry beyond the cap.
    pub fn push_version(&mut self, version: PromptVersion) {
        self.history.insert(0, version);
        self.history.truncate(HISTORY_LIMIT);
    }

    /// Push a run at the head of the saved runs, dropping the oldest entry
    /// beyond the cap.
    pub fn push_run(&mut self, run: SavedRun) {
        self.saved_runs.insert(0, run);
        self.saved_runs.truncate(SAVED_RUN_LIMIT);
    }

    /// Overwrite fields present in `patch`. Does not touch timestamps or
    /// take snapshots; callers decide both.
    pub fn merge(&mut self, patch: PromptPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(system_instruction) = patch.system_instruction {
            self.system_instruction = if system_instruction.is_empty() {
                None
            } else {
                Some(system_instruction)
            };
        }
        if let Some(english_prompt) = patch.english_prompt {
            self.english_prompt = if english_prompt.is_empty() {
                None
            } else {
                Some(english_prompt)
            };
        }
        if let Some(chinese_prompt) = patch.chinese_prompt {
            self.chinese_prompt = if chinese_prompt.is_empty() {
                None
            } else {
                Some(chinese_prompt)
            };
        }
        if let Some(examples) = patch.examples {
            self.examples = examples;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(output_type) = patch.output_type {
            self.output_type = if output_type.is_empty() {
                None
            } else {
                Some(output_type)
            };
        }
        if let Some(application_scene) = patch.application_scene {
            self.application_scene = if application_scene.is_empty() {
                None
            } else {
                Some(application_scene)
            };
        }
        if let Some(labels) = patch.labels {
            self.labels = labels;
        }
        if let Some(config) = patch.config {
            self.config = config;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
    }

    /// Duplicate this record into a brand-new one: fresh identity and
    /// timestamps, suffixed title, empty history. Trash status does not
    /// carry over.
    pub fn duplicate_as(&self, id: String, now: i64) -> Prompt {
        let mut copy = self.clone();
        copy.id = id;
        copy.title = format!("{}{}", self.title, COPY_SUFFIX);
        copy.history = Vec::new();
        copy.created_at = now;
        copy.updated_at = now;
        copy.collected_at = now;
        copy.deleted_at = None;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Prompt {
        Prompt::from_patch(
            "abcdef12".to_string(),
            PromptPatch {
                title: Some("Summarizer".to_string()),
                content: Some("Summarize {{text}}".to_string()),
                category: Some("Writing".to_string()),
                tags: Some(vec!["nlp".to_string()]),
                ..Default::default()
            },
            1_000,
        )
    }

    #[test]
    fn create_fills_identity_and_defaults() {
        let p = sample();
        assert_eq!(p.title, "Summarizer");
        assert_eq!(p.category, "Writing");
        assert_eq!(p.created_at, 1_000);
        assert_eq!(p.updated_at, 1_000);
        assert_eq!(p.collected_at, 1_000);
        assert_eq!(p.status, PromptStatus::Active);
        assert!(p.history.is_empty());
        assert!(!p.is_trashed());
    }

    #[test]
    fn blank_title_becomes_untitled() {
        let p = Prompt::from_patch("x".to_string(), PromptPatch::default(), 0);
        assert_eq!(p.title, "Untitled");
    }

    #[test]
    fn content_change_wants_snapshot() {
        let p = sample();
        let patch = PromptPatch {
            content: Some("Summarize {{text}} briefly".to_string()),
            ..Default::default()
        };
        assert!(p.would_snapshot(&patch));
    }

    #[test]
    fn identical_content_does_not_want_snapshot() {
        let p = sample();
        let patch = PromptPatch {
            content: Some(p.content.clone()),
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert!(!p.would_snapshot(&patch));
    }

    #[test]
    fn metadata_only_change_does_not_want_snapshot() {
        let p = sample();
        let patch = PromptPatch {
            title: Some("Renamed".to_string()),
            tags: Some(vec!["a".to_string(), "b".to_string()]),
            category: Some("Coding".to_string()),
            is_favorite: Some(true),
            ..Default::default()
        };
        assert!(!p.would_snapshot(&patch));
    }

    #[test]
    fn config_change_wants_snapshot() {
        let p = sample();
        let mut config = p.config.clone();
        config.temperature = 0.2;
        let patch = PromptPatch {
            config: Some(config),
            ..Default::default()
        };
        assert!(p.would_snapshot(&patch));
    }

    #[test]
    fn equal_config_value_does_not_want_snapshot() {
        // Structural equality, not identity: a config equal in value to the
        // current one is not a substantive change.
        let p = sample();
        let patch = PromptPatch {
            config: Some(p.config.clone()),
            ..Default::default()
        };
        assert!(!p.would_snapshot(&patch));
    }

    #[test]
    fn examples_change_wants_snapshot() {
        let p = sample();
        let patch = PromptPatch {
            examples: Some(vec![Example {
                input: "in".to_string(),
                output: "out".to_string(),
            }]),
            ..Default::default()
        };
        assert!(p.would_snapshot(&patch));
    }

    #[test]
    fn clearing_absent_system_instruction_is_not_substantive() {
        let p = sample();
        let patch = PromptPatch {
            system_instruction: Some(String::new()),
            ..Default::default()
        };
        assert!(!p.would_snapshot(&patch));
    }

    #[test]
    fn history_capped_oldest_dropped() {
        let mut p = sample();
        for i in 0..15 {
            let mut v = p.version_snapshot(i);
            v.content = format!("v{}", i);
            p.push_version(v);
        }
        assert_eq!(p.history.len(), HISTORY_LIMIT);
        // Newest first; the oldest five snapshots fell off the tail.
        assert_eq!(p.history[0].content, "v14");
        assert_eq!(p.history[HISTORY_LIMIT - 1].content, "v5");
    }

    #[test]
    fn saved_runs_capped_oldest_dropped() {
        let mut p = sample();
        for i in 0..25 {
            p.push_run(SavedRun {
                id: format!("run{}", i),
                timestamp: i,
                model: "m".to_string(),
                vars: BTreeMap::new(),
                output: String::new(),
                rating: None,
            });
        }
        assert_eq!(p.saved_runs.len(), SAVED_RUN_LIMIT);
        assert_eq!(p.saved_runs[0].id, "run24");
        assert_eq!(p.saved_runs[SAVED_RUN_LIMIT - 1].id, "run5");
    }

    #[test]
    fn snapshot_keeps_pre_edit_values() {
        let p = sample();
        let v = p.version_snapshot(2_000);
        assert_eq!(v.timestamp, 2_000);
        assert_eq!(v.title, "Summarizer");
        assert_eq!(v.content, "Summarize {{text}}");
    }

    #[test]
    fn duplicate_resets_identity_and_history() {
        let mut p = sample();
        p.push_version(p.version_snapshot(1_500));
        p.deleted_at = Some(1_600);
        let copy = p.duplicate_as("feedbeef".to_string(), 2_000);
        assert_eq!(copy.id, "feedbeef");
        assert_eq!(copy.title, "Summarizer (Copy)");
        assert!(copy.history.is_empty());
        assert_eq!(copy.created_at, 2_000);
        assert!(copy.deleted_at.is_none());
        // Substance carries over.
        assert_eq!(copy.content, p.content);
        assert_eq!(copy.tags, p.tags);
    }

    #[test]
    fn merge_clears_optional_text_with_empty_string() {
        let mut p = sample();
        p.system_instruction = Some("Be terse".to_string());
        p.merge(PromptPatch {
            system_instruction: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(p.system_instruction, None);
    }

    #[test]
    fn serde_uses_camel_case_and_defaults() {
        let p = sample();
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"isFavorite\""));
        assert!(!json.contains("\"created_at\""));

        // Sparse foreign records deserialize with defaults filled in.
        let sparse = r#"{"id":"x1","title":"T","content":"C"}"#;
        let parsed: Prompt = serde_json::from_str(sparse).unwrap();
        assert_eq!(parsed.category, "General");
        assert_eq!(parsed.status, PromptStatus::Active);
        assert!(parsed.history.is_empty());
    }
}
