use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Failed to read file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write file {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No block in the parsed file matched the requested id or content.
    #[error("Task not found in {path:?} (id: {requested_id:?}, content: {content:?})")]
    TaskNotFound {
        path: PathBuf,
        requested_id: String,
        content: Option<String>,
    },
    /// A block matched, but no raw bullet line could be paired with it.
    #[error("Could not find line to update in {path:?} (block id: {block_id:?}, content: {content:?})")]
    LineNotFound {
        path: PathBuf,
        block_id: Option<String>,
        content: String,
    },
    #[error("Invalid page name: {0:?}")]
    InvalidPageName(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Watch error: {0}")]
    Watch(String),
}

impl From<notify::Error> for GraphError {
    fn from(value: notify::Error) -> Self {
        Self::Watch(value.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
