//! Read-only queries over a `GraphIndex` snapshot.
//!
//! Nothing here mutates the index. Lookups for unknown pages or ids return
//! empty collections or `None`.

pub mod context;
pub mod tasks;
pub mod temporal;

use std::collections::{HashSet, VecDeque};

use indexmap::IndexSet;
use serde::Serialize;

use crate::graph::{GraphIndex, Page, JOURNAL_PREFIX};
use crate::outline::Block;

/// Characters kept from block content in search excerpts.
pub const EXCERPT_CHARS: usize = 200;
/// Matched blocks attached to one search result.
pub const MAX_RESULT_BLOCKS: usize = 5;
/// Neighbouring blocks returned on each side by `get_block_by_id`.
const BLOCK_CONTEXT_RADIUS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Results must score strictly above this.
    pub relevance_threshold: usize,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            relevance_threshold: 0,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockExcerpt {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub page_name: String,
    pub score: usize,
    pub excerpt: String,
    pub blocks: Vec<BlockExcerpt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalHop {
    pub page_name: String,
    pub hop: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedOptions {
    pub max_hops: usize,
    pub min_connections: usize,
}

impl Default for RelatedOptions {
    fn default() -> Self {
        Self {
            max_hops: 2,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    SharedConnections,
    SharedTags,
    SharedProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPage {
    pub page_name: String,
    pub strength: usize,
    pub hop: usize,
    pub connection_types: Vec<ConnectionType>,
}

/// A block resolved by id, with its page and flattened neighbours.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext<'a> {
    pub block: &'a Block,
    pub page: &'a Page,
    pub block_index: usize,
    pub before: &'a [Block],
    pub after: &'a [Block],
}

/// Lowercase whitespace-separated words longer than two characters.
pub fn query_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Sum over query words of how many times each occurs in `content` (case-insensitive).
pub fn score_block_relevance(content: &str, query: &str) -> usize {
    let content = content.to_lowercase();
    query_words(query)
        .iter()
        .map(|word| content.matches(word.as_str()).count())
        .sum()
}

impl GraphIndex {
    pub fn get_page(&self, name: &str) -> Option<&Page> {
        self.pages.get(name)
    }

    pub fn page_names(&self) -> Vec<&str> {
        self.pages.keys().map(String::as_str).collect()
    }

    pub fn journal_page_names(&self) -> Vec<&str> {
        self.pages
            .keys()
            .filter(|name| name.starts_with(JOURNAL_PREFIX))
            .map(String::as_str)
            .collect()
    }

    /// Weighted keyword search over every page.
    ///
    /// Per query word: +1 for a whole-file word hit, +2 per block containing the word,
    /// +3 if the page name contains it, +1 if any tag contains it.
    pub fn search_graph(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let words = query_words(query);
        let mut results = Vec::new();

        for (page_name, page) in &self.pages {
            let page_words = self.search_index.get(page_name);
            let lower_name = page_name.to_lowercase();
            let lower_tags: Vec<String> = page.all_tags.iter().map(|t| t.to_lowercase()).collect();
            let mut score = 0;
            let mut matched = Vec::new();

            for word in &words {
                if page_words.is_some_and(|set| set.contains(word)) {
                    score += 1;
                }
                for block in &page.blocks {
                    if block.content.to_lowercase().contains(word.as_str()) {
                        score += 2;
                        matched.push(BlockExcerpt {
                            content: truncate_chars(&block.content, EXCERPT_CHARS),
                            id: block.id.clone(),
                        });
                    }
                }
                if lower_name.contains(word.as_str()) {
                    score += 3;
                }
                if lower_tags.iter().any(|t| t.contains(word.as_str())) {
                    score += 1;
                }
            }

            if score > options.relevance_threshold {
                matched.truncate(MAX_RESULT_BLOCKS);
                results.push(SearchResult {
                    page_name: page_name.clone(),
                    score,
                    excerpt: page
                        .blocks
                        .first()
                        .map(|b| truncate_chars(&b.content, EXCERPT_CHARS))
                        .unwrap_or_default(),
                    blocks: matched,
                });
            }
        }

        // Stable sort keeps index order among equal scores.
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(options.limit);
        log::debug!("[query] search {:?}: {} results", query, results.len());
        results
    }

    pub fn get_backlinks(&self, page_name: &str) -> Vec<String> {
        self.backlinks
            .get(page_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct references across the page's blocks, in order of first appearance.
    pub fn get_forward_links(&self, page_name: &str) -> Vec<String> {
        let Some(page) = self.pages.get(page_name) else {
            return Vec::new();
        };
        let links: IndexSet<&String> = page.blocks.iter().flat_map(|b| b.references.iter()).collect();
        links.into_iter().cloned().collect()
    }

    /// Backlinks first, then forward links, without duplicates.
    pub fn get_connected_pages(&self, page_name: &str) -> Vec<String> {
        let mut connected: IndexSet<String> = self.get_backlinks(page_name).into_iter().collect();
        connected.extend(self.get_forward_links(page_name));
        connected.into_iter().collect()
    }

    /// Breadth-first walk over connected pages. The start page is not reported.
    pub fn traverse_graph(&self, page_name: &str, max_hops: usize) -> Vec<TraversalHop> {
        let mut found = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([page_name.to_string()]);
        let mut queue: VecDeque<(String, usize)> = VecDeque::from([(page_name.to_string(), 0)]);

        while let Some((current, hop)) = queue.pop_front() {
            if hop >= max_hops {
                continue;
            }
            for next in self.get_connected_pages(&current) {
                if visited.insert(next.clone()) {
                    found.push(TraversalHop {
                        page_name: next.clone(),
                        hop: hop + 1,
                    });
                    queue.push_back((next, hop + 1));
                }
            }
        }

        found
    }

    /// Pages reachable within `max_hops`, scored by what they share with the source.
    ///
    /// Strength is shared connections + 2 x shared tags + shared identical properties.
    pub fn find_related_pages(&self, page_name: &str, options: &RelatedOptions) -> Vec<RelatedPage> {
        let source_connections: HashSet<String> = self.get_connected_pages(page_name).into_iter().collect();
        let source_page = self.pages.get(page_name);

        let mut related = Vec::new();
        for TraversalHop { page_name: candidate, hop } in self.traverse_graph(page_name, options.max_hops) {
            let shared_connections = self
                .get_connected_pages(&candidate)
                .iter()
                .filter(|c| source_connections.contains(*c))
                .count();

            let (shared_tags, shared_properties) = match (source_page, self.pages.get(&candidate)) {
                (Some(source), Some(other)) => {
                    let tags = other.all_tags.iter().filter(|t| source.all_tags.contains(t)).count();
                    let properties = other
                        .all_properties
                        .iter()
                        .filter(|(key, value)| source.all_properties.get(*key) == Some(*value))
                        .count();
                    (tags, properties)
                }
                _ => (0, 0),
            };

            let strength = shared_connections + shared_tags * 2 + shared_properties;
            if strength < options.min_connections {
                continue;
            }

            let mut connection_types = Vec::new();
            if shared_connections > 0 {
                connection_types.push(ConnectionType::SharedConnections);
            }
            if shared_tags > 0 {
                connection_types.push(ConnectionType::SharedTags);
            }
            if shared_properties > 0 {
                connection_types.push(ConnectionType::SharedProperties);
            }

            related.push(RelatedPage {
                page_name: candidate,
                strength,
                hop,
                connection_types,
            });
        }

        related.sort_by(|a, b| b.strength.cmp(&a.strength));
        related
    }

    /// Non-journal pages with no links in either direction.
    /// Tagged pages count as connected unless `include_tagged` is set.
    pub fn find_orphaned_pages(&self, include_tagged: bool) -> Vec<String> {
        self.pages
            .values()
            .filter(|page| !page.is_journal())
            .filter(|page| include_tagged || page.all_tags.is_empty())
            .filter(|page| {
                self.backlinks.get(&page.name).map_or(true, |set| set.is_empty())
                    && page.blocks.iter().all(|b| b.references.is_empty())
            })
            .map(|page| page.name.clone())
            .collect()
    }

    pub fn get_block_by_id(&self, block_id: &str) -> Option<BlockContext<'_>> {
        let location = self.block_ids.get(block_id)?;
        let page = self.pages.get(&location.page_name)?;
        let index = location.block_index;
        let block = page.blocks.get(index)?;

        let start = index.saturating_sub(BLOCK_CONTEXT_RADIUS);
        let end = (index + 1 + BLOCK_CONTEXT_RADIUS).min(page.blocks.len());
        Some(BlockContext {
            block,
            page,
            block_index: index,
            before: &page.blocks[start..index],
            after: &page.blocks[index + 1..end],
        })
    }
}
