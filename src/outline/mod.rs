pub mod block;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

pub use block::{Block, TaskStatus};

/// Bullet with text: "- content", "* content", "+ content", "1. content"
static BULLET_WITH_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(?:[-*+]|\d+\.)\s+(.+)$").unwrap());
/// Bare marker: "-", "* ", "3."
static BULLET_EMPTY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)(?:[-*+]|\d+\.)\s*$").unwrap());
static BLOCK_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z0-9]{13})\s+(.+)$").unwrap());
static PROPERTY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w[\w-]*)::\s*(.+)$").unwrap());
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(?:#([\w/-]+)|#\[\[([^\]]+)\]\])").unwrap());
static PAGE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static BLOCK_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\(([^)]+)\)\)").unwrap());
static TASK_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(TODO|DOING|DONE|LATER|NOW|WAITING|CANCELED)\s+").unwrap()
});

/// A line recognised as an outline bullet.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletLine<'a> {
    pub indent: usize,
    pub level: usize,
    pub content: &'a str,
}

/// Width of leading indentation. A tab counts as one level (two columns).
fn indent_width(indent: &str) -> usize {
    indent
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum()
}

/// Match a single raw line (without its line terminator) against the bullet patterns.
pub fn parse_bullet_line(line: &str) -> Option<BulletLine<'_>> {
    let line = line.trim_end_matches('\r');
    if let Some(caps) = BULLET_WITH_CONTENT.captures(line) {
        let indent = indent_width(caps.get(1).map_or("", |m| m.as_str()));
        let content = caps.get(2).map_or("", |m| m.as_str());
        return Some(BulletLine { indent, level: indent / 2, content });
    }
    if let Some(caps) = BULLET_EMPTY.captures(line) {
        let indent = indent_width(caps.get(1).map_or("", |m| m.as_str()));
        return Some(BulletLine { indent, level: indent / 2, content: "" });
    }
    None
}

/// Split a leading 13-character alphanumeric id off the content.
pub fn extract_block_id(content: &str) -> (Option<&str>, &str) {
    match BLOCK_ID.captures(content) {
        Some(caps) => {
            let id = caps.get(1).map(|m| m.as_str());
            let rest = caps.get(2).map_or("", |m| m.as_str());
            (id, rest)
        }
        None => (None, content),
    }
}

/// Parse a `key:: value` line.
pub fn parse_property_line(line: &str) -> Option<(String, String)> {
    let caps = PROPERTY.captures(line.trim())?;
    let key = caps.get(1)?.as_str().to_string();
    let value = caps.get(2)?.as_str().trim().to_string();
    Some((key, value))
}

/// Remove `key:: value` lines from the content, returning them as properties.
pub fn extract_properties(content: &str) -> (IndexMap<String, String>, String) {
    let mut properties = IndexMap::new();
    let mut cleaned = Vec::new();
    for line in content.split('\n') {
        match parse_property_line(line) {
            Some((key, value)) => {
                properties.insert(key, value);
            }
            None => cleaned.push(line),
        }
    }
    (properties, cleaned.join("\n"))
}

/// Names from `#tag` and `#[[multi word tag]]`, de-duplicated in order of appearance.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in TAG.captures_iter(content) {
        let tag = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        if let Some(tag) = tag {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
    }
    tags
}

/// Page names from `[[Page Name]]`, duplicates kept.
pub fn extract_page_references(content: &str) -> Vec<String> {
    PAGE_REF
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Block ids from `((block-id))`.
pub fn extract_block_references(content: &str) -> Vec<String> {
    BLOCK_REF
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Task keyword at the start of the content, followed by whitespace.
pub fn detect_task_status(content: &str) -> Option<TaskStatus> {
    strip_task_status(content).0
}

/// Split a leading task keyword off the content.
pub fn strip_task_status(content: &str) -> (Option<TaskStatus>, &str) {
    match TASK_PREFIX.captures(content) {
        Some(caps) => {
            let status = caps.get(1).and_then(|m| TaskStatus::from_keyword(m.as_str()));
            let end = caps.get(0).map_or(0, |m| m.end());
            (status, &content[end..])
        }
        None => (None, content),
    }
}

/// Build a block from the text following a bullet marker.
pub fn parse_block_content(raw: &str, level: usize) -> Block {
    let (id, rest) = extract_block_id(raw);
    let (properties, cleaned) = extract_properties(rest);
    let tags = extract_tags(&cleaned);
    let references = extract_page_references(&cleaned);
    let block_refs = extract_block_references(&cleaned);
    let content = cleaned.trim().to_string();
    let task_status = detect_task_status(&content);

    Block {
        id: id.map(str::to_string),
        content,
        level,
        children: Vec::new(),
        properties,
        tags,
        references,
        block_refs,
        task_status,
    }
}

/// Attach `block` to the top of the stack, or to the roots when the stack is empty.
fn attach(stack: &mut Vec<Block>, roots: &mut Vec<Block>, block: Block) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(block),
        None => roots.push(block),
    }
}

/// Parse outline markdown into its root blocks.
///
/// Blank lines are skipped. Lines that are not bullets are dropped, except
/// `key:: value` lines, which become properties of the most recent block.
pub fn parse_outline(body: &str) -> Vec<Block> {
    let mut roots: Vec<Block> = Vec::new();
    let mut stack: Vec<Block> = Vec::new();

    for line in body.split('\n') {
        if line.trim().is_empty() {
            continue;
        }

        let bullet = match parse_bullet_line(line) {
            Some(b) => b,
            None => {
                if let (Some(open), Some((key, value))) = (stack.last_mut(), parse_property_line(line)) {
                    open.properties.insert(key, value);
                }
                continue;
            }
        };

        let block = parse_block_content(bullet.content, bullet.level);

        while stack.last().is_some_and(|top| top.level >= block.level) {
            if let Some(done) = stack.pop() {
                attach(&mut stack, &mut roots, done);
            }
        }
        stack.push(block);
    }

    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }

    roots
}

/// Pre-order flattening that moves children out of their parents.
pub fn flatten_blocks(roots: Vec<Block>) -> Vec<Block> {
    let mut flat = Vec::new();
    for mut block in roots {
        let children = std::mem::take(&mut block.children);
        flat.push(block);
        flat.extend(flatten_blocks(children));
    }
    flat
}

/// Pre-order traversal by reference.
pub fn walk_blocks(roots: &[Block]) -> Vec<&Block> {
    let mut all = Vec::new();
    for block in roots {
        all.push(block);
        all.extend(walk_blocks(&block.children));
    }
    all
}

/// Render blocks back to outline markdown, two spaces per level.
pub fn render_outline(roots: &[Block]) -> String {
    let mut out = String::new();
    for block in walk_blocks(roots) {
        let indent = "  ".repeat(block.level);
        out.push_str(&indent);
        out.push('-');
        if let Some(id) = &block.id {
            out.push(' ');
            out.push_str(id);
        }
        if !block.content.is_empty() {
            out.push(' ');
            out.push_str(&block.content);
        }
        out.push('\n');
        for (key, value) in &block.properties {
            out.push_str(&format!("{}  {}:: {}\n", indent, key, value));
        }
    }
    out
}
