use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use crate::errors::{GraphError, GraphResult};

/// Suffix of the sibling file used while writing atomically.
pub const TEMP_SUFFIX: &str = ".outline-tmp";

/// Directories with this name hold editor backups and are never indexed.
const BACKUP_DIR: &str = "bak";

fn is_backup_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == BACKUP_DIR
}

/// Recursively collect `.md` files under `root`, skipping `bak` directories.
pub fn list_markdown_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_backup_dir(entry))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                log::warn!("[scanner] Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("md")
        })
        .map(|entry| entry.into_path())
        .collect()
}

pub fn read_file(path: &Path) -> GraphResult<String> {
    fs::read_to_string(path).map_err(|source| GraphError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `content` to `path`, creating parent directories.
/// Writes a temp file in the same directory, then renames it over the target.
pub fn write_file(path: &Path, content: &str) -> GraphResult<()> {
    let write_err = |source: std::io::Error| GraphError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = path.with_file_name(format!("{}{}", file_name, TEMP_SUFFIX));

    let mut file = fs::File::create(&temp_path).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(e));
    }
    Ok(())
}

pub fn stat_modified_time(path: &Path) -> GraphResult<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .map_err(|source| GraphError::FileRead {
            path: path.to_path_buf(),
            source,
        })
}
