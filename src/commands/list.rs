use console::style;

use crate::api::PromptVault;
use crate::core::filter::{CategoryFilter, PromptView, SortDirection, SortKey};

pub struct Options {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub favorites: bool,
    pub recent: bool,
    pub sort: Option<String>,
    pub asc: bool,
    pub clear: bool,
    pub more: bool,
}

impl Options {
    fn touches_view(&self) -> bool {
        self.clear
            || self.category.is_some()
            || self.tag.is_some()
            || self.search.is_some()
            || self.favorites
            || self.recent
            || self.sort.is_some()
            || self.more
    }
}

/// List prompts through the persisted view, applying any filter flags first.
pub async fn run(vault: &PromptVault, opts: Options) -> Result<(), String> {
    let sort = match &opts.sort {
        Some(key) => Some(parse_sort(key, opts.asc)?),
        None => None,
    };

    let view = if opts.touches_view() {
        vault
            .update_view(|v| {
                if opts.clear {
                    *v = PromptView::default();
                }
                if let Some(category) = &opts.category {
                    v.set_category(parse_category(category));
                }
                if let Some(tag) = &opts.tag {
                    v.set_tag(Some(tag.clone()));
                }
                if let Some(search) = &opts.search {
                    v.set_search(search.clone());
                }
                if opts.favorites {
                    v.set_favorites_only(true);
                }
                if opts.recent {
                    v.set_recent_only(true);
                }
                if let Some((key, direction)) = sort {
                    v.set_sort(key, direction);
                }
                if opts.more {
                    v.load_more();
                }
            })
            .await
    } else {
        vault.view().await
    };

    let page = vault.visible().await;

    if page.items.is_empty() {
        println!("{}", style("No prompts match the current view").yellow());
        if view.query() != &crate::core::filter::ViewQuery::default() {
            println!("  Use 'list --clear' to reset the filters.");
        }
        return Ok(());
    }

    let header = if view.query().category == CategoryFilter::Trash {
        format!("Trash ({} of {} shown):", page.items.len(), page.total)
    } else {
        format!("Prompts ({} of {} shown):", page.items.len(), page.total)
    };
    println!("{}", style(header).green().bold());

    if let Some(filters) = describe_filters(&view) {
        println!("  {}", style(filters).dim());
    }

    for p in &page.items {
        let star = if p.is_favorite { "★ " } else { "" };
        let tags = if p.tags.is_empty() {
            String::new()
        } else {
            format!(
                "  {}",
                p.tags
                    .iter()
                    .map(|t| format!("#{}", t))
                    .collect::<Vec<_>>()
                    .join(" ")
            )
        };
        println!(
            "  {} {} {}{}  {}{}",
            style("•").green(),
            style(&p.id).yellow(),
            star,
            p.title,
            style(format!("[{}]", p.category)).dim(),
            style(tags).dim()
        );
    }

    if page.has_more {
        println!("  Use 'list --more' for the next page.");
    }
    Ok(())
}

fn parse_category(name: &str) -> CategoryFilter {
    match name.to_lowercase().as_str() {
        "all" => CategoryFilter::All,
        "trash" => CategoryFilter::Trash,
        _ => CategoryFilter::Named(name.to_string()),
    }
}

fn parse_sort(key: &str, asc: bool) -> Result<(SortKey, SortDirection), String> {
    let key = match key.to_lowercase().as_str() {
        "created" => SortKey::CreatedAt,
        "title" => SortKey::Title,
        "category" => SortKey::Category,
        other => {
            return Err(format!(
                "Unknown sort key '{}'. Use 'created', 'title', or 'category'",
                other
            ))
        }
    };
    let direction = if asc {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    Ok((key, direction))
}

fn describe_filters(view: &PromptView) -> Option<String> {
    let q = view.query();
    let mut parts = Vec::new();
    if let CategoryFilter::Named(name) = &q.category {
        parts.push(format!("category={}", name));
    }
    if let Some(tag) = &q.tag {
        parts.push(format!("tag={}", tag));
    }
    if !q.search.is_empty() {
        parts.push(format!("search='{}'", q.search));
    }
    if q.favorites_only {
        parts.push("favorites".to_string());
    }
    if q.recent_only {
        parts.push("recent".to_string());
    }
    if q.sort != SortKey::default() || q.direction != SortDirection::default() {
        let key = match q.sort {
            SortKey::CreatedAt => "created",
            SortKey::Title => "title",
            SortKey::Category => "category",
        };
        let dir = match q.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        parts.push(format!("sort={} {}", key, dir));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Filters: {}", parts.join("  ")))
    }
}
