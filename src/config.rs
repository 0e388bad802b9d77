use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, GraphResult};
use crate::graph::scanner;

/// Which blocks of a selected page are handed to the chat context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeBlocks {
    /// The first N blocks in document order.
    #[default]
    All,
    /// Only blocks containing at least one query word.
    Matched,
    /// Blocks ranked by relevance to the query.
    Top,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    pub max_pages: usize,
    pub max_blocks_per_page: usize,
    pub max_total_blocks: usize,
    pub search_result_limit: usize,
    pub relevance_threshold: usize,
    pub include_blocks: IncludeBlocks,
    pub exclude_namespaces: Vec<String>,
    pub date_range_days: Option<i64>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_pages: 5,
            max_blocks_per_page: 50,
            max_total_blocks: 100,
            search_result_limit: 5,
            relevance_threshold: 1,
            include_blocks: IncludeBlocks::All,
            exclude_namespaces: Vec::new(),
            date_range_days: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphSettings {
    pub graph_path: Option<PathBuf>,
    pub watch_debounce_ms: u64,
    pub context: ContextSettings,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            graph_path: None,
            watch_debounce_ms: 500,
            context: ContextSettings::default(),
        }
    }
}

impl GraphSettings {
    /// Read settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> GraphResult<Self> {
        if !path.exists() {
            log::info!("[config] No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| GraphError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> GraphResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        scanner::write_file(path, &json)
    }

    pub fn watch_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.watch_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = ContextSettings::default();
        assert_eq!(settings.max_pages, 5);
        assert_eq!(settings.max_blocks_per_page, 50);
        assert_eq!(settings.max_total_blocks, 100);
        assert_eq!(settings.search_result_limit, 5);
        assert_eq!(settings.relevance_threshold, 1);
        assert_eq!(settings.include_blocks, IncludeBlocks::All);
        assert!(settings.exclude_namespaces.is_empty());
        assert_eq!(settings.date_range_days, None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"context": {"maxPages": 3, "includeBlocks": "top", "excludeNamespaces": ["private"]}}"#;
        let settings: GraphSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.watch_debounce_ms, 500);
        assert_eq!(settings.context.max_pages, 3);
        assert_eq!(settings.context.include_blocks, IncludeBlocks::Top);
        assert_eq!(settings.context.exclude_namespaces, vec!["private".to_string()]);
        assert_eq!(settings.context.max_total_blocks, 100);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = GraphSettings::load(&temp_dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, GraphSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config/settings.json");
        let mut settings = GraphSettings::default();
        settings.graph_path = Some(PathBuf::from("/notes/graph"));
        settings.context.date_range_days = Some(30);

        settings.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"graphPath\""));
        assert!(raw.contains("\"dateRangeDays\": 30"));
        assert_eq!(GraphSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(GraphSettings::load(&path), Err(GraphError::Config(_))));
    }
}
