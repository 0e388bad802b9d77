//! Targeted edits to page files on disk.
//!
//! These operate on the files, not on the index snapshot. Callers rebuild the
//! index afterwards if queries need to see the change.

pub mod pages;

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::{GraphError, GraphResult};
use crate::frontmatter::split_frontmatter_body;
use crate::graph::scanner;
use crate::outline::{extract_block_id, flatten_blocks, parse_outline, strip_task_status, Block, TaskStatus};

/// Bullet prefix (indent, marker, separator) and the text after it.
static BULLET_PARTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*(?:[-*+]|\d+\.)\s+)(.*)$").unwrap());
static BLOCK_ID_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{13}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub path: PathBuf,
    /// 1-based line number in the file.
    pub line_number: usize,
    pub previous_line: String,
    pub updated_line: String,
}

/// How closely a piece of text matched the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchKind {
    Substring,
    Exact,
    BlockId,
}

/// Lowercased text with any leading status keyword removed.
fn normalize(text: &str) -> String {
    strip_task_status(text.trim()).1.trim().to_lowercase()
}

fn compare(candidate: &str, wanted: &str) -> Option<MatchKind> {
    if candidate.is_empty() || wanted.is_empty() {
        return None;
    }
    if candidate == wanted {
        Some(MatchKind::Exact)
    } else if candidate.contains(wanted) || wanted.contains(candidate) {
        Some(MatchKind::Substring)
    } else {
        None
    }
}

fn is_block_id(text: &str) -> bool {
    BLOCK_ID_SHAPE.is_match(text)
}

/// Best block for `search_text`: exact before substring, then blocks whose status
/// equals the status written in `search_text`, then document order.
fn find_block_by_content<'a>(blocks: &'a [Block], search_text: &str) -> Option<&'a Block> {
    let known_status = strip_task_status(search_text.trim()).0;
    let wanted = normalize(search_text);

    blocks
        .iter()
        .enumerate()
        .filter_map(|(index, block)| {
            let kind = compare(&normalize(&block.content), &wanted)?;
            let status_matches = known_status.is_some() && block.task_status == known_status;
            Some((index, kind, status_matches, block))
        })
        .min_by_key(|(index, kind, status_matches, _)| (Reverse(*kind), Reverse(*status_matches), *index))
        .map(|(_, _, _, block)| block)
}

fn locate_block<'a>(blocks: &'a [Block], identifier: &str, fallback_content: Option<&str>) -> Option<&'a Block> {
    if is_block_id(identifier) {
        if let Some(block) = blocks.iter().find(|b| b.id.as_deref() == Some(identifier)) {
            return Some(block);
        }
        log::debug!("[mutate] Block id {} not found, matching by content", identifier);
    }

    let mut search_texts: Vec<&str> = Vec::new();
    if !is_block_id(identifier) {
        search_texts.push(identifier);
    }
    search_texts.extend(fallback_content);

    search_texts
        .into_iter()
        .find_map(|text| find_block_by_content(blocks, text))
}

/// The parts of a raw bullet line needed to rewrite its status.
struct RawBullet<'a> {
    /// Indentation, marker and separator, verbatim.
    prefix: &'a str,
    /// Block id plus its trailing whitespace, verbatim.
    id_part: &'a str,
    id: Option<&'a str>,
    status: Option<TaskStatus>,
    /// Content after id and status keyword.
    text: &'a str,
}

fn split_raw_bullet(line: &str) -> Option<RawBullet<'_>> {
    let caps = BULLET_PARTS.captures(line)?;
    let prefix = caps.get(1)?.as_str();
    let after = caps.get(2)?.as_str();
    let (id, rest) = extract_block_id(after);
    let id_part = &after[..after.len() - rest.len()];
    let (status, text) = strip_task_status(rest);
    Some(RawBullet {
        prefix,
        id_part,
        id,
        status,
        text,
    })
}

/// Set the status keyword of one task block in `path` and write the file back.
///
/// `block_id_or_content` is tried as a block id when it has that shape, otherwise
/// (or when no block carries that id) as content. `fallback_content` is matched
/// by content if the identifier finds nothing.
pub fn update_task_status(
    path: &Path,
    block_id_or_content: &str,
    new_status: TaskStatus,
    fallback_content: Option<&str>,
) -> GraphResult<TaskUpdate> {
    let content = scanner::read_file(path)?;
    let body = split_frontmatter_body(&content).map_or(content.as_str(), |(_, body)| body);
    let body_offset = content.len() - body.len();
    let first_body_line = content[..body_offset].matches('\n').count();

    let blocks = flatten_blocks(parse_outline(body));
    let target = locate_block(&blocks, block_id_or_content, fallback_content).ok_or_else(|| {
        GraphError::TaskNotFound {
            path: path.to_path_buf(),
            requested_id: block_id_or_content.to_string(),
            content: fallback_content.map(str::to_string),
        }
    })?;

    let target_text = normalize(&target.content);
    let target_id = target.id.as_deref();

    let mut lines: Vec<&str> = content.split('\n').collect();
    let best_line = lines
        .iter()
        .enumerate()
        .skip(first_body_line)
        .filter_map(|(index, line)| {
            let raw = split_raw_bullet(line.trim_end_matches('\r'))?;
            let kind = if target_id.is_some() && raw.id == target_id {
                MatchKind::BlockId
            } else {
                compare(&raw.text.trim().to_lowercase(), &target_text)?
            };
            Some((index, kind, raw.status == target.task_status))
        })
        .min_by_key(|(index, kind, same_status)| (Reverse(*kind), Reverse(*same_status), *index))
        .map(|(index, _, _)| index);

    let Some(line_index) = best_line else {
        return Err(GraphError::LineNotFound {
            path: path.to_path_buf(),
            block_id: target.id.clone(),
            content: target_text,
        });
    };

    let previous_line = lines[line_index];
    let (bare, line_ending) = match previous_line.strip_suffix('\r') {
        Some(bare) => (bare, "\r"),
        None => (previous_line, ""),
    };
    let raw = split_raw_bullet(bare).ok_or_else(|| GraphError::LineNotFound {
        path: path.to_path_buf(),
        block_id: target.id.clone(),
        content: target_text.clone(),
    })?;
    let updated_line = format!(
        "{}{}{} {}{}",
        raw.prefix,
        raw.id_part,
        new_status.as_str(),
        raw.text,
        line_ending
    );

    let update = TaskUpdate {
        path: path.to_path_buf(),
        line_number: line_index + 1,
        previous_line: bare.to_string(),
        updated_line: updated_line.trim_end_matches('\r').to_string(),
    };
    lines[line_index] = &updated_line;
    scanner::write_file(path, &lines.join("\n"))?;

    log::info!(
        "[mutate] {:?} line {}: {:?} -> {:?}",
        path,
        update.line_number,
        update.previous_line,
        update.updated_line
    );
    Ok(update)
}
