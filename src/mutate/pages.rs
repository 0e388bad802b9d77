use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{GraphError, GraphResult};
use crate::graph::{scanner, JOURNAL_PREFIX};
use crate::query::temporal::journal_date;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

const JOURNALS_DIR: &str = "journals";
const PAGES_DIR: &str = "pages";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 100, day % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    }
}

/// Journal heading text, e.g. `Sunday, Jan 5th, 2025`.
pub fn format_journal_title(date: NaiveDate) -> String {
    let weekday = date.format("%A");
    let month = MONTHS[date.month0() as usize];
    format!(
        "{}, {} {}{}, {}",
        weekday,
        month,
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

/// File-name-safe page name: punctuation dropped, whitespace runs become `_`.
pub fn sanitize_page_name(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name, "");
    let underscored = WHITESPACE_RUN.replace_all(&cleaned, "_");
    let collapsed = UNDERSCORE_RUN.replace_all(&underscored, "_");
    collapsed.trim_matches('_').to_string()
}

fn journal_path(root: &Path, stem: &str) -> PathBuf {
    root.join(JOURNALS_DIR).join(format!("{}.md", stem))
}

/// Existing text padded to end in a blank line, or a fresh dated heading.
fn journal_prefix(path: &Path, date: Option<NaiveDate>) -> GraphResult<String> {
    if path.exists() {
        let mut existing = scanner::read_file(path)?;
        if !existing.ends_with('\n') {
            existing.push('\n');
        }
        if !existing.ends_with("\n\n") {
            existing.push('\n');
        }
        return Ok(existing);
    }
    Ok(date
        .map(|d| format!("# {}\n\n", format_journal_title(d)))
        .unwrap_or_default())
}

/// Append `content` to the journal for `date`, creating it with a heading if needed.
pub fn create_journal_entry(root: &Path, date: NaiveDate, content: &str) -> GraphResult<PathBuf> {
    let path = journal_path(root, &date.format("%Y_%m_%d").to_string());
    let text = journal_prefix(&path, Some(date))? + content;
    scanner::write_file(&path, &text)?;
    log::info!("[pages] Wrote journal entry {:?}", path);
    Ok(path)
}

/// Write a new page with a `title` frontmatter header. An existing page is replaced.
pub fn create_page(root: &Path, page_name: &str, content: &str) -> GraphResult<PathBuf> {
    let sanitized = sanitize_page_name(page_name);
    if sanitized.is_empty() {
        return Err(GraphError::InvalidPageName(page_name.to_string()));
    }
    let path = root.join(PAGES_DIR).join(format!("{}.md", sanitized));
    let text = format!("---\ntitle: {}\n---\n\n{}", page_name, content);
    scanner::write_file(&path, &text)?;
    log::info!("[pages] Created page {:?}", path);
    Ok(path)
}

/// Append to a page or, for `journals/...` names, to that journal.
pub fn append_to_page(root: &Path, page_name: &str, content: &str) -> GraphResult<PathBuf> {
    if let Some(stem) = page_name.strip_prefix(JOURNAL_PREFIX) {
        if stem.is_empty() || stem.contains(['/', '\\']) || stem.contains("..") {
            return Err(GraphError::InvalidPageName(page_name.to_string()));
        }
        let path = journal_path(root, stem);
        let text = journal_prefix(&path, journal_date(page_name))? + content;
        scanner::write_file(&path, &text)?;
        log::info!("[pages] Appended to journal {:?}", path);
        return Ok(path);
    }

    let sanitized = sanitize_page_name(page_name);
    if sanitized.is_empty() {
        return Err(GraphError::InvalidPageName(page_name.to_string()));
    }
    let path = root.join(PAGES_DIR).join(format!("{}.md", sanitized));
    let mut text = if path.exists() {
        scanner::read_file(&path)?
    } else {
        String::new()
    };
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(content);
    scanner::write_file(&path, &text)?;
    log::info!("[pages] Appended to page {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_journal_title() {
        assert_eq!(format_journal_title(day(2025, 1, 5)), "Sunday, Jan 5th, 2025");
        assert_eq!(format_journal_title(day(2025, 3, 1)), "Saturday, Mar 1st, 2025");
        assert_eq!(format_journal_title(day(2025, 3, 22)), "Saturday, Mar 22nd, 2025");
        assert_eq!(format_journal_title(day(2025, 3, 13)), "Thursday, Mar 13th, 2025");
        assert_eq!(format_journal_title(day(2025, 10, 23)), "Thursday, Oct 23rd, 2025");
    }

    #[test]
    fn test_sanitize_page_name() {
        assert_eq!(sanitize_page_name("Project Plan: Q1!"), "Project_Plan_Q1");
        assert_eq!(sanitize_page_name("  spaced   out  "), "spaced_out");
        assert_eq!(sanitize_page_name("already_snake__case"), "already_snake_case");
        assert_eq!(sanitize_page_name("keep-dashes"), "keep-dashes");
        assert_eq!(sanitize_page_name("?!"), "");
    }

    #[test]
    fn test_create_journal_entry_new_and_existing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let path = create_journal_entry(root, day(2025, 1, 5), "- first").unwrap();
        assert_eq!(path, root.join("journals/2025_01_05.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Sunday, Jan 5th, 2025\n\n- first");

        create_journal_entry(root, day(2025, 1, 5), "- second").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Sunday, Jan 5th, 2025\n\n- first\n\n- second"
        );
    }

    #[test]
    fn test_create_page_writes_title_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_page(temp_dir.path(), "Reading List", "- Dune").unwrap();
        assert_eq!(path, temp_dir.path().join("pages/Reading_List.md"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "---\ntitle: Reading List\n---\n\n- Dune"
        );
    }

    #[test]
    fn test_create_page_rejects_empty_name() {
        let temp_dir = TempDir::new().unwrap();
        let err = create_page(temp_dir.path(), "???", "- x").unwrap_err();
        assert!(matches!(err, GraphError::InvalidPageName(_)));
    }

    #[test]
    fn test_append_to_page() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::write(root.join("pages/Ideas.md"), "- one").unwrap();

        let path = append_to_page(root, "Ideas", "- two").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "- one\n- two");

        let fresh = append_to_page(root, "Brand New", "- hello").unwrap();
        assert_eq!(fs::read_to_string(fresh).unwrap(), "- hello");
    }

    #[test]
    fn test_write_failures_propagate_and_keep_existing_page() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let page = root.join("pages/Ideas.md");
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::write(&page, "- one").unwrap();
        fs::create_dir(root.join(format!("pages/Ideas.md{}", scanner::TEMP_SUFFIX))).unwrap();

        let err = append_to_page(root, "Ideas", "- two").unwrap_err();
        assert!(matches!(err, GraphError::FileWrite { .. }));
        let err = create_page(root, "Ideas", "- replaced").unwrap_err();
        assert!(matches!(err, GraphError::FileWrite { .. }));

        assert_eq!(fs::read_to_string(&page).unwrap(), "- one");
    }

    #[test]
    fn test_append_to_missing_journal_creates_heading() {
        let temp_dir = TempDir::new().unwrap();
        let path = append_to_page(temp_dir.path(), "journals/2025_10_29", "- standup").unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "# Wednesday, Oct 29th, 2025\n\n- standup"
        );
    }

    #[test]
    fn test_append_to_journal_rejects_path_escape() {
        let temp_dir = TempDir::new().unwrap();
        let err = append_to_page(temp_dir.path(), "journals/../secret", "- x").unwrap_err();
        assert!(matches!(err, GraphError::InvalidPageName(_)));
    }
}
