pub mod scanner;
pub mod watcher;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::errors::{GraphError, GraphResult};
use crate::frontmatter::{split_frontmatter, Frontmatter};
use crate::outline::{flatten_blocks, parse_outline, Block, TaskStatus};

/// Namespace prefix of daily journal pages.
pub const JOURNAL_PREFIX: &str = "journals/";
/// Regular pages live here; the prefix is not part of their name so `[[Name]]` resolves to them.
pub const PAGES_PREFIX: &str = "pages/";

/// One markdown file of the graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub path: PathBuf,
    pub name: String,
    pub frontmatter: Frontmatter,
    /// Flattened pre-order blocks; `children` are always empty here.
    pub blocks: Vec<Block>,
    pub all_tags: Vec<String>,
    pub all_properties: IndexMap<String, String>,
    pub task_counts: BTreeMap<TaskStatus, usize>,
    pub modification_date: DateTime<Utc>,
}

impl Page {
    pub fn is_journal(&self) -> bool {
        self.name.starts_with(JOURNAL_PREFIX)
    }
}

/// Where a block id lives: page name plus index into that page's flattened blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLocation {
    pub page_name: String,
    pub block_index: usize,
}

/// Immutable snapshot of the whole graph.
#[derive(Debug, Default)]
pub struct GraphIndex {
    pub pages: IndexMap<String, Page>,
    /// target page -> pages referencing it
    pub backlinks: IndexMap<String, IndexSet<String>>,
    pub tags: IndexMap<String, IndexSet<String>>,
    pub properties: IndexMap<String, IndexSet<String>>,
    /// page -> lowercase words longer than two characters from the raw file
    pub search_index: IndexMap<String, HashSet<String>>,
    pub block_ids: HashMap<String, BlockLocation>,
    pub tasks: IndexMap<TaskStatus, IndexSet<String>>,
}

impl GraphIndex {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn journal_count(&self) -> usize {
        self.pages.values().filter(|p| p.is_journal()).count()
    }
}

/// Counts reported after a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub file_count: usize,
    pub journal_file_count: usize,
    pub page_count: usize,
    pub generation: u64,
}

/// Page name from a file path: relative to `root`, `/`-separated, `.md` stripped.
/// Files under `pages/` are named without that directory.
pub fn page_name_for(path: &Path, root: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    };
    let name = relative.strip_suffix(".md").unwrap_or(&relative);
    name.strip_prefix(PAGES_PREFIX).unwrap_or(name).to_string()
}

/// Lowercase words longer than two characters, with non-word characters treated as spaces.
pub fn extract_words(content: &str) -> HashSet<String> {
    let cleaned: String = content
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Parse a single page from its raw text.
pub fn parse_page(path: &Path, name: String, content: &str, modification_date: DateTime<Utc>) -> Page {
    let (frontmatter, body) = split_frontmatter(content);
    let blocks = flatten_blocks(parse_outline(body));

    let mut all_tags: Vec<String> = Vec::new();
    let mut all_properties = IndexMap::new();
    let mut task_counts = TaskStatus::zeroed_counts();

    for block in &blocks {
        if let Some(status) = block.task_status {
            *task_counts.entry(status).or_insert(0) += 1;
        }
        for tag in &block.tags {
            if !all_tags.contains(tag) {
                all_tags.push(tag.clone());
            }
        }
        for (key, value) in &block.properties {
            all_properties.insert(key.clone(), value.clone());
        }
    }

    Page {
        path: path.to_path_buf(),
        name,
        frontmatter,
        blocks,
        all_tags,
        all_properties,
        task_counts,
        modification_date,
    }
}

fn index_file(path: &Path, root: &Path) -> GraphResult<(Page, HashSet<String>)> {
    let content = scanner::read_file(path)?;
    let modified = scanner::stat_modified_time(path)?;
    let name = page_name_for(path, root);
    let words = extract_words(&content);
    Ok((parse_page(path, name, &content, modified), words))
}

/// Build a fresh snapshot from the given files. Unreadable files are logged and skipped,
/// as is any file whose page name was already taken by an earlier file.
pub fn build_index(file_paths: &[PathBuf], root: &Path) -> GraphIndex {
    let mut index = GraphIndex::default();

    for path in file_paths {
        let (page, words) = match index_file(path, root) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("[graph/index] Skipping {:?}: {}", path, e);
                continue;
            }
        };
        let page_name = page.name.clone();
        if let Some(existing) = index.pages.get(&page_name) {
            log::warn!(
                "[graph/index] Skipping {:?}: page {} already indexed from {:?}",
                path,
                page_name,
                existing.path
            );
            continue;
        }

        for (block_index, block) in page.blocks.iter().enumerate() {
            if let Some(id) = &block.id {
                match index.block_ids.get(id) {
                    Some(existing) => log::warn!(
                        "[graph/index] Duplicate block ID found: {} in page {} (already exists in {})",
                        id,
                        page_name,
                        existing.page_name
                    ),
                    None => {
                        index.block_ids.insert(
                            id.clone(),
                            BlockLocation {
                                page_name: page_name.clone(),
                                block_index,
                            },
                        );
                    }
                }
            }

            if let Some(status) = block.task_status {
                index.tasks.entry(status).or_default().insert(page_name.clone());
            }
            for tag in &block.tags {
                index.tags.entry(tag.clone()).or_default().insert(page_name.clone());
            }
            for key in block.properties.keys() {
                index.properties.entry(key.clone()).or_default().insert(page_name.clone());
            }
            for reference in &block.references {
                index.backlinks.entry(reference.clone()).or_default().insert(page_name.clone());
            }
        }

        index.search_index.insert(page_name.clone(), words);
        index.pages.insert(page_name, page);
    }

    let task_pages: usize = index.tasks.values().map(|s| s.len()).sum();
    log::info!(
        "[graph/index] Index complete: {} pages, {} journals, {} block IDs, {} tasks",
        index.pages.len(),
        index.journal_count(),
        index.block_ids.len(),
        task_pages
    );

    index
}

/// Owner of the current snapshot. Readers get an `Arc` to an immutable index;
/// rebuilds replace it wholesale.
pub struct IndexStore {
    current: RwLock<Arc<GraphIndex>>,
    rebuild_lock: Mutex<()>,
    generation: AtomicU64,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(GraphIndex::default())),
            rebuild_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The snapshot visible right now. Stays valid even if a rebuild swaps in a new one.
    pub fn snapshot(&self) -> Arc<GraphIndex> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Swap in a new snapshot and return its generation.
    pub fn install(&self, index: GraphIndex) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(index);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// List, parse and index every markdown file under `root`, then swap the result in.
    /// Concurrent callers are serialized.
    pub fn rebuild_index(&self, root: &Path) -> GraphResult<RebuildSummary> {
        let _rebuilding = self.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !root.is_dir() {
            return Err(GraphError::FileRead {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "graph root is not a directory"),
            });
        }

        let files = scanner::list_markdown_files(root);
        let journal_file_count = files
            .iter()
            .filter(|p| page_name_for(p, root).starts_with(JOURNAL_PREFIX))
            .count();
        log::info!(
            "[graph/index] Rebuilding from {:?}: {} files ({} journals)",
            root,
            files.len(),
            journal_file_count
        );

        let index = build_index(&files, root);
        let page_count = index.pages.len();
        let generation = self.install(index);

        Ok(RebuildSummary {
            file_count: files.len(),
            journal_file_count,
            page_count,
            generation,
        })
    }
}
