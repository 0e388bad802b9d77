//! Picks the pages and blocks handed to a chat assistant as context for a question.

use chrono::NaiveDate;
use serde::Serialize;

use super::{query_words, score_block_relevance, SearchOptions};
use crate::config::{ContextSettings, IncludeBlocks};
use crate::graph::{GraphIndex, JOURNAL_PREFIX};
use crate::outline::Block;

/// Upper bound on the characters of a rendered context page.
pub const MARKDOWN_CHAR_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPage<'a> {
    pub page_name: String,
    pub score: usize,
    pub excerpt: String,
    pub blocks: Vec<&'a Block>,
    pub markdown: String,
}

pub fn filter_blocks<'a>(blocks: &'a [Block], query: &str, mode: IncludeBlocks, max_blocks: usize) -> Vec<&'a Block> {
    match mode {
        IncludeBlocks::All => blocks.iter().take(max_blocks).collect(),
        IncludeBlocks::Matched => {
            let words = query_words(query);
            blocks
                .iter()
                .filter(|b| {
                    let content = b.content.to_lowercase();
                    words.iter().any(|w| content.contains(w.as_str()))
                })
                .take(max_blocks)
                .collect()
        }
        IncludeBlocks::Top => {
            let mut scored: Vec<(usize, &Block)> = blocks
                .iter()
                .map(|b| (score_block_relevance(&b.content, query), b))
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.into_iter().take(max_blocks).map(|(_, b)| b).collect()
        }
    }
}

/// True if the page is a namespace listed in `exclude_namespaces` or lives under one.
pub fn should_exclude_page(page_name: &str, exclude_namespaces: &[String]) -> bool {
    exclude_namespaces.iter().any(|ns| {
        page_name == ns
            || page_name
                .strip_prefix(ns.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Whether a journal falls within the last `days` days before `today`.
///
/// No limit (or zero) includes everything. Names that are not `YYYY_MM_DD`
/// or name an impossible date are included as well.
pub fn is_journal_in_range(page_name: &str, days: Option<i64>, today: NaiveDate) -> bool {
    let days = match days {
        None | Some(0) => return true,
        Some(d) => d,
    };

    let stem = page_name.strip_prefix(JOURNAL_PREFIX).unwrap_or(page_name);
    let parts: Vec<&str> = stem.split('_').collect();
    let [year, month, day] = parts.as_slice() else {
        return true;
    };
    let (Ok(year), Ok(month), Ok(day)) = (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>()) else {
        return true;
    };
    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
        return true;
    };

    let diff = (today - date).num_days();
    (0..=days).contains(&diff)
}

/// Outline markdown for the blocks, two spaces per level, cut to `MARKDOWN_CHAR_LIMIT` characters.
pub fn format_blocks_as_markdown(blocks: &[&Block]) -> String {
    let rendered = blocks
        .iter()
        .map(|b| format!("{}- {}", "  ".repeat(b.level), b.content))
        .collect::<Vec<_>>()
        .join("\n");
    rendered.chars().take(MARKDOWN_CHAR_LIMIT).collect()
}

impl GraphIndex {
    /// Search, then trim the results to what the context settings allow.
    pub fn select_context(&self, query: &str, settings: &ContextSettings, today: NaiveDate) -> Vec<ContextPage<'_>> {
        let options = SearchOptions {
            relevance_threshold: settings.relevance_threshold,
            limit: settings.search_result_limit,
        };

        let mut selected = Vec::new();
        let mut total_blocks = 0;

        for result in self.search_graph(query, &options) {
            if selected.len() >= settings.max_pages || total_blocks >= settings.max_total_blocks {
                break;
            }
            if should_exclude_page(&result.page_name, &settings.exclude_namespaces) {
                log::debug!("[query/context] Excluding {} by namespace", result.page_name);
                continue;
            }
            if result.page_name.starts_with(JOURNAL_PREFIX)
                && !is_journal_in_range(&result.page_name, settings.date_range_days, today)
            {
                continue;
            }
            let Some(page) = self.pages.get(&result.page_name) else {
                continue;
            };

            let remaining = settings.max_total_blocks - total_blocks;
            let per_page = settings.max_blocks_per_page.min(remaining);
            let blocks = filter_blocks(&page.blocks, query, settings.include_blocks, per_page);
            total_blocks += blocks.len();

            selected.push(ContextPage {
                markdown: format_blocks_as_markdown(&blocks),
                page_name: result.page_name,
                score: result.score,
                excerpt: result.excerpt,
                blocks,
            });
        }

        log::debug!(
            "[query/context] Selected {} pages, {} blocks for {:?}",
            selected.len(),
            total_blocks,
            query
        );
        selected
    }
}
