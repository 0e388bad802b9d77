pub mod config;
pub mod errors;
pub mod frontmatter;
pub mod graph;
pub mod mutate;
pub mod outline;
pub mod query;



#[cfg(test)]
mod query_search_test;


#[cfg(test)]
mod task_query_test;



pub use config::{ContextSettings, GraphSettings, IncludeBlocks};
pub use errors::{GraphError, GraphResult};
pub use graph::watcher::GraphWatcher;
pub use graph::{build_index, BlockLocation, GraphIndex, IndexStore, Page, RebuildSummary};
pub use mutate::pages::{append_to_page, create_journal_entry, create_page};
pub use mutate::{update_task_status, TaskUpdate};
pub use outline::{parse_outline, Block, TaskStatus};
pub use query::tasks::{TaskQuery, TaskRecord, TaskSummary};
pub use query::temporal::{parse_date_range, DateRange};
pub use query::{score_block_relevance, RelatedOptions, SearchOptions, SearchResult};
