use serde::{Deserialize, Serialize};

use crate::core::prompt::{Prompt, RECENT_WINDOW_MS};

/// Prompts revealed per page of results.
pub const PAGE_SIZE: usize = 12;

/// Category axis of a view. `Trash` is the only way to see soft-deleted
/// records; every other variant excludes them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Trash,
    Named(String),
}

/// Field the visible list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Title,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// The full set of filter and ordering criteria for a prompt view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewQuery {
    pub category: CategoryFilter,
    pub tag: Option<String>,
    pub search: String,
    pub favorites_only: bool,
    pub recent_only: bool,
    pub sort: SortKey,
    pub direction: SortDirection,
}

/// A query plus how many pages the user has revealed. Any change to the
/// query snaps the revealed pages back to one, so setters are the only way
/// in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptView {
    query: ViewQuery,
    pages_revealed: usize,
}

impl Default for PromptView {
    fn default() -> Self {
        Self {
            query: ViewQuery::default(),
            pages_revealed: 1,
        }
    }
}

/// One evaluated page window over a prompt list.
#[derive(Debug)]
pub struct ViewPage<'a> {
    /// Matching prompts up to the revealed-page cutoff, in final order.
    pub items: Vec<&'a Prompt>,
    /// Matches before pagination.
    pub total: usize,
    /// Whether more matches exist past the cutoff.
    pub has_more: bool,
}

impl PromptView {
    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn pages_revealed(&self) -> usize {
        self.pages_revealed
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        if self.query.category != category {
            self.query.category = category;
            self.pages_revealed = 1;
        }
    }

    pub fn set_tag(&mut self, tag: Option<String>) {
        if self.query.tag != tag {
            self.query.tag = tag;
            self.pages_revealed = 1;
        }
    }

    pub fn set_search(&mut self, search: String) {
        if self.query.search != search {
            self.query.search = search;
            self.pages_revealed = 1;
        }
    }

    pub fn set_favorites_only(&mut self, on: bool) {
        if self.query.favorites_only != on {
            self.query.favorites_only = on;
            self.pages_revealed = 1;
        }
    }

    pub fn set_recent_only(&mut self, on: bool) {
        if self.query.recent_only != on {
            self.query.recent_only = on;
            self.pages_revealed = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortKey, direction: SortDirection) {
        if self.query.sort != sort || self.query.direction != direction {
            self.query.sort = sort;
            self.query.direction = direction;
            self.pages_revealed = 1;
        }
    }

    /// Reveal one more page of the current view.
    pub fn load_more(&mut self) {
        self.pages_revealed += 1;
    }

    /// Evaluate the view against `prompts`. Pure: same inputs, same output.
    /// `now` anchors the recency window.
    pub fn select<'a>(&self, prompts: &'a [Prompt], now: i64) -> ViewPage<'a> {
        select(&self.query, self.pages_revealed, prompts, now)
    }
}

/// Filter, sort, and paginate `prompts` according to `query`.
pub fn select<'a>(
    query: &ViewQuery,
    pages_revealed: usize,
    prompts: &'a [Prompt],
    now: i64,
) -> ViewPage<'a> {
    let mut items: Vec<&Prompt> = prompts.iter().filter(|p| matches(query, p, now)).collect();

    // Stable sort: only the key comparison flips with direction, so equal
    // keys keep their stored order either way.
    items.sort_by(|a, b| {
        let ord = match query.sort {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
        };
        match query.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });

    let total = items.len();
    let cutoff = pages_revealed.max(1) * PAGE_SIZE;
    items.truncate(cutoff);
    ViewPage {
        has_more: total > cutoff,
        total,
        items,
    }
}

/// Whether a single prompt passes every active criterion.
fn matches(query: &ViewQuery, prompt: &Prompt, now: i64) -> bool {
    // Trash gate first: the trash view shows only deleted records, every
    // other view hides them.
    match &query.category {
        CategoryFilter::Trash => {
            if !prompt.is_trashed() {
                return false;
            }
        }
        _ => {
            if prompt.is_trashed() {
                return false;
            }
        }
    }

    if let CategoryFilter::Named(name) = &query.category {
        if prompt.category != *name {
            return false;
        }
    }

    if let Some(tag) = &query.tag {
        if !prompt.tags.iter().any(|t| t == tag) {
            return false;
        }
    }

    if !query.search.is_empty() {
        let needle = query.search.to_lowercase();
        let hit = prompt.title.to_lowercase().contains(&needle)
            || prompt.description.to_lowercase().contains(&needle)
            || prompt.content.to_lowercase().contains(&needle)
            || prompt.category.to_lowercase().contains(&needle)
            || prompt
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    if query.favorites_only && !prompt.is_favorite {
        return false;
    }

    if query.recent_only && now.saturating_sub(prompt.last_touched()) > RECENT_WINDOW_MS {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::PromptPatch;

    fn prompt(id: &str, title: &str, category: &str, created_at: i64) -> Prompt {
        let mut p = Prompt::from_patch(
            id.to_string(),
            PromptPatch {
                title: Some(title.to_string()),
                content: Some(format!("content of {}", title)),
                category: Some(category.to_string()),
                ..Default::default()
            },
            created_at,
        );
        p.created_at = created_at;
        p.updated_at = created_at;
        p
    }

    fn fixture() -> Vec<Prompt> {
        let mut alpha = prompt("a1", "Alpha", "Writing", 100);
        alpha.tags = vec!["draft".to_string()];
        alpha.is_favorite = true;
        let beta = prompt("b2", "beta", "Coding", 200);
        let mut gamma = prompt("c3", "Gamma", "Writing", 300);
        gamma.deleted_at = Some(350);
        vec![alpha, beta, gamma]
    }

    #[test]
    fn default_view_hides_trash_newest_first() {
        let prompts = fixture();
        let page = PromptView::default().select(&prompts, 1_000);
        let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "a1"]);
        assert_eq!(page.total, 2);
        assert!(!page.has_more);
    }

    #[test]
    fn trash_view_shows_only_deleted() {
        let prompts = fixture();
        let mut view = PromptView::default();
        view.set_category(CategoryFilter::Trash);
        let page = view.select(&prompts, 1_000);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "c3");
    }

    #[test]
    fn named_category_excludes_others_and_trash() {
        let prompts = fixture();
        let mut view = PromptView::default();
        view.set_category(CategoryFilter::Named("Writing".to_string()));
        let page = view.select(&prompts, 1_000);
        // Gamma is in Writing but trashed.
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "a1");
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let prompts = fixture();
        let mut view = PromptView::default();
        view.set_search("ALPHA".to_string());
        assert_eq!(view.select(&prompts, 1_000).items.len(), 1);

        view.set_search("draft".to_string());
        let page = view.select(&prompts, 1_000);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "a1");
    }

    #[test]
    fn favorites_and_tag_filters_compose() {
        let prompts = fixture();
        let mut view = PromptView::default();
        view.set_favorites_only(true);
        view.set_tag(Some("draft".to_string()));
        let page = view.select(&prompts, 1_000);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "a1");

        view.set_tag(Some("missing".to_string()));
        assert!(view.select(&prompts, 1_000).items.is_empty());
    }

    #[test]
    fn recent_window_excludes_stale_prompts() {
        let mut prompts = fixture();
        prompts[0].updated_at = 0;
        prompts[0].created_at = 0;
        let mut view = PromptView::default();
        view.set_recent_only(true);
        let now = RECENT_WINDOW_MS + 500;
        let ids: Vec<&str> = view
            .select(&prompts, now)
            .items
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b2"]);
    }

    #[test]
    fn title_sort_ignores_case_and_direction_keeps_tie_order() {
        let mut prompts = fixture();
        prompts.push(prompt("d4", "alpha", "Misc", 400));
        let mut view = PromptView::default();
        view.set_sort(SortKey::Title, SortDirection::Ascending);
        let ids: Vec<&str> = view
            .select(&prompts, 1_000)
            .items
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        // "Alpha" (a1) and "alpha" (d4) compare equal; stored order decides.
        assert_eq!(ids, vec!["a1", "d4", "b2"]);

        view.set_sort(SortKey::Title, SortDirection::Descending);
        let ids: Vec<&str> = view
            .select(&prompts, 1_000)
            .items
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        // Ties still keep stored order under the flipped direction.
        assert_eq!(ids, vec!["b2", "a1", "d4"]);
    }

    #[test]
    fn selection_is_idempotent() {
        let prompts = fixture();
        let mut view = PromptView::default();
        view.set_search("content".to_string());
        let first: Vec<String> = view
            .select(&prompts, 1_000)
            .items
            .iter()
            .map(|p| p.id.clone())
            .collect();
        let second: Vec<String> = view
            .select(&prompts, 1_000)
            .items
            .iter()
            .map(|p| p.id.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn pagination_windows_grow_then_reset_on_query_change() {
        let prompts: Vec<Prompt> = (0..30)
            .map(|i| prompt(&format!("p{:02}", i), &format!("Prompt {:02}", i), "General", i))
            .collect();
        let mut view = PromptView::default();

        let page = view.select(&prompts, 1_000);
        assert_eq!(page.items.len(), PAGE_SIZE);
        assert_eq!(page.total, 30);
        assert!(page.has_more);

        view.load_more();
        view.load_more();
        assert_eq!(view.pages_revealed(), 3);
        let page = view.select(&prompts, 1_000);
        assert_eq!(page.items.len(), 30);
        assert!(!page.has_more);

        // Any query change collapses back to a single page.
        view.set_search("Prompt".to_string());
        assert_eq!(view.pages_revealed(), 1);
        assert_eq!(view.select(&prompts, 1_000).items.len(), PAGE_SIZE);
    }

    #[test]
    fn setting_same_value_does_not_reset_pages() {
        let mut view = PromptView::default();
        view.set_search("x".to_string());
        view.load_more();
        view.set_search("x".to_string());
        assert_eq!(view.pages_revealed(), 2);
    }
}
