//! Date handling for journal pages: range parsing, range queries,
//! journal comparison and recurring-pattern detection.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::graph::{GraphIndex, Page, JOURNAL_PREFIX};

static EXPLICIT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})\s+to\s+(\d{4}-\d{2}-\d{2})").unwrap());
static LAST_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:last|past)\s+(\d+)\s+(day|week|month)s?\b").unwrap());
static LAST_WEEK_OR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:last|past)\s+(week|month)\b").unwrap());
static SINGLE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}_]+").unwrap());

const JOURNAL_NAME_FORMAT: &str = "%Y_%m_%d";
const ISO_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry<'a> {
    pub page: &'a Page,
    pub date: NaiveDate,
    pub iso_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalComparison {
    pub date1: String,
    pub date2: String,
    pub content_similarity: f64,
    pub shared_tags: Vec<String>,
    pub unique_tags1: Vec<String>,
    pub unique_tags2: Vec<String>,
    pub block_count1: usize,
    pub block_count2: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    RecurringTag,
    RecurringTopic,
    RecurringContent,
    DayOfWeek,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub pattern: String,
    pub frequency: usize,
    pub examples: Vec<String>,
    pub description: String,
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Calendar date of a `journals/YYYY_MM_DD` page. `None` for other pages or impossible dates.
pub fn journal_date(page_name: &str) -> Option<NaiveDate> {
    let stem = page_name.strip_prefix(JOURNAL_PREFIX)?;
    NaiveDate::parse_from_str(stem, JOURNAL_NAME_FORMAT).ok()
}

pub fn journal_page_name(date: NaiveDate) -> String {
    format!("{}{}", JOURNAL_PREFIX, date.format(JOURNAL_NAME_FORMAT))
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, ISO_FORMAT).ok()
}

/// Interpret a natural-language date phrase relative to `reference` (default: today).
///
/// Recognised, first match wins: `YYYY-MM-DD to YYYY-MM-DD`, `last|past N days|weeks|months`,
/// `last|past week|month`, `yesterday`, `today`, a single `YYYY-MM-DD`.
pub fn parse_date_range(text: &str, reference: Option<NaiveDate>) -> Option<DateRange> {
    let text = text.to_lowercase();
    let reference = reference.unwrap_or_else(today);

    if let Some(caps) = EXPLICIT_RANGE.captures(&text) {
        let start = parse_iso(&caps[1])?;
        let end = parse_iso(&caps[2])?;
        return Some(DateRange::new(start, end));
    }

    if let Some(caps) = LAST_N.captures(&text) {
        let amount: u32 = caps[1].parse().ok()?;
        let start = match &caps[2] {
            "day" => reference.checked_sub_days(Days::new(u64::from(amount)))?,
            "week" => reference.checked_sub_days(Days::new(u64::from(amount) * 7))?,
            _ => reference.checked_sub_months(Months::new(amount))?,
        };
        return Some(DateRange::new(start, reference));
    }

    if let Some(caps) = LAST_WEEK_OR_MONTH.captures(&text) {
        let start = match &caps[1] {
            "week" => reference.checked_sub_days(Days::new(7))?,
            _ => reference.checked_sub_months(Months::new(1))?,
        };
        return Some(DateRange::new(start, reference));
    }

    if text.contains("yesterday") {
        return reference.pred_opt().map(DateRange::single);
    }
    if text.contains("today") {
        return Some(DateRange::single(reference));
    }

    SINGLE_DATE
        .find(&text)
        .and_then(|m| parse_iso(m.as_str()))
        .map(DateRange::single)
}

/// Monday through Sunday of the week containing `day`.
pub fn week_containing(day: NaiveDate) -> DateRange {
    let offset = u64::from(day.weekday().num_days_from_monday());
    let start = day - Days::new(offset);
    DateRange::new(start, start + Days::new(6))
}

/// Lowercase words longer than `min_len` characters.
fn words_longer_than(text: &str, min_len: usize) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(move |w| w.chars().count() > min_len)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Occurrence counter that remembers the first dates each key was seen on.
#[derive(Default)]
struct Recurrence {
    counts: HashMap<String, (usize, Vec<NaiveDate>)>,
}

impl Recurrence {
    fn record(&mut self, key: String, date: NaiveDate) {
        let entry = self.counts.entry(key).or_insert_with(|| (0, Vec::new()));
        entry.0 += 1;
        if entry.1.len() < 3 {
            entry.1.push(date);
        }
    }

    /// Keys seen at least `threshold` times, most frequent first, ties by key.
    fn above(self, threshold: f64, cap: Option<usize>) -> Vec<(String, usize, Vec<NaiveDate>)> {
        let mut kept: Vec<_> = self
            .counts
            .into_iter()
            .filter(|(_, (count, _))| *count as f64 >= threshold)
            .map(|(key, (count, dates))| (key, count, dates))
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(cap) = cap {
            kept.truncate(cap);
        }
        kept
    }
}

impl GraphIndex {
    pub fn get_journal(&self, date: NaiveDate) -> Option<&Page> {
        self.pages.get(&journal_page_name(date))
    }

    /// Journals dated within `[start, end]`, newest first.
    pub fn query_journals_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<JournalEntry<'_>> {
        let range = DateRange::new(start, end);
        let mut entries: Vec<JournalEntry<'_>> = self
            .pages
            .values()
            .filter_map(|page| {
                let date = journal_date(&page.name)?;
                range.contains(date).then(|| JournalEntry {
                    page,
                    date,
                    iso_date: iso_date(date),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    pub fn query_journals_last_n_days(&self, days: u64, reference: Option<NaiveDate>) -> Vec<JournalEntry<'_>> {
        let end = reference.unwrap_or_else(today);
        let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        self.query_journals_by_date_range(start, end)
    }

    pub fn query_journals_last_week(&self, reference: Option<NaiveDate>) -> Vec<JournalEntry<'_>> {
        self.query_journals_last_n_days(7, reference)
    }

    pub fn query_journals_last_month(&self, reference: Option<NaiveDate>) -> Vec<JournalEntry<'_>> {
        let end = reference.unwrap_or_else(today);
        let start = end.checked_sub_months(Months::new(1)).unwrap_or(NaiveDate::MIN);
        self.query_journals_by_date_range(start, end)
    }

    /// Keyword overlap and tag differences between two journal days.
    /// `None` if either journal does not exist.
    pub fn compare_journals(&self, date1: NaiveDate, date2: NaiveDate) -> Option<JournalComparison> {
        let first = self.get_journal(date1)?;
        let second = self.get_journal(date2)?;

        let keywords = |page: &Page| -> HashSet<String> {
            page.blocks
                .iter()
                .flat_map(|b| words_longer_than(&b.content, 3).collect::<Vec<_>>())
                .collect()
        };
        let words1 = keywords(first);
        let words2 = keywords(second);
        let union = words1.union(&words2).count();
        let intersection = words1.intersection(&words2).count();
        let content_similarity = if union == 0 {
            0.0
        } else {
            (intersection as f64 / union as f64 * 100.0).round() / 100.0
        };

        let shared_tags: Vec<String> = first
            .all_tags
            .iter()
            .filter(|t| second.all_tags.contains(t))
            .cloned()
            .collect();
        let unique = |a: &Page, b: &Page| -> Vec<String> {
            a.all_tags.iter().filter(|t| !b.all_tags.contains(t)).cloned().collect()
        };

        Some(JournalComparison {
            date1: iso_date(date1),
            date2: iso_date(date2),
            content_similarity,
            shared_tags,
            unique_tags1: unique(first, second),
            unique_tags2: unique(second, first),
            block_count1: first.blocks.len(),
            block_count2: second.blocks.len(),
        })
    }

    /// Recurring tags, topics, block openings and weekdays across the given journal days.
    /// Repeated dates are counted once.
    ///
    /// Thresholds scale with the number of journals actually found:
    /// tags and topics need max(2, 30%), content prefixes need max(2, 20%), weekdays need 2.
    pub fn detect_patterns(&self, dates: &[NaiveDate]) -> Vec<Pattern> {
        let mut seen = HashSet::new();
        let journals: Vec<(NaiveDate, &Page)> = dates
            .iter()
            .filter(|date| seen.insert(**date))
            .filter_map(|date| self.get_journal(*date).map(|page| (*date, page)))
            .collect();
        if journals.is_empty() {
            return Vec::new();
        }

        let total = journals.len() as f64;
        let common_threshold = (total * 0.3).max(2.0);
        let content_threshold = (total * 0.2).max(2.0);

        let mut tags = Recurrence::default();
        let mut topics = Recurrence::default();
        let mut openings = Recurrence::default();
        let mut weekdays = Recurrence::default();

        for (date, page) in &journals {
            for tag in &page.all_tags {
                tags.record(tag.clone(), *date);
            }

            let page_topics: BTreeSet<String> = page
                .blocks
                .iter()
                .flat_map(|b| words_longer_than(&b.content, 4).collect::<Vec<_>>())
                .collect();
            for topic in page_topics {
                topics.record(topic, *date);
            }

            let page_openings: BTreeSet<String> = page
                .blocks
                .iter()
                .filter_map(|b| {
                    let prefix: Vec<&str> = b.content.split_whitespace().take(3).collect();
                    (!prefix.is_empty()).then(|| prefix.join(" ").to_lowercase())
                })
                .collect();
            for opening in page_openings {
                openings.record(opening, *date);
            }

            weekdays.record(weekday_name(date.weekday()).to_string(), *date);
        }

        let mut patterns = Vec::new();
        let mut push = |pattern_type: PatternType, found: Vec<(String, usize, Vec<NaiveDate>)>| {
            for (pattern, frequency, examples) in found {
                let description = match pattern_type {
                    PatternType::RecurringTag => format!("Tag #{} appears in {} journals", pattern, frequency),
                    PatternType::RecurringTopic => format!("Topic \"{}\" mentioned in {} journals", pattern, frequency),
                    PatternType::RecurringContent => {
                        format!("Entries starting with \"{}\" recur in {} journals", pattern, frequency)
                    }
                    PatternType::DayOfWeek => format!("{} journals were written on a {}", frequency, pattern),
                };
                patterns.push(Pattern {
                    pattern_type,
                    pattern,
                    frequency,
                    examples: examples.into_iter().map(iso_date).collect(),
                    description,
                });
            }
        };

        push(PatternType::RecurringTag, tags.above(common_threshold, None));
        push(PatternType::RecurringTopic, topics.above(common_threshold, Some(20)));
        push(PatternType::RecurringContent, openings.above(content_threshold, Some(10)));
        push(PatternType::DayOfWeek, weekdays.above(2.0, None));

        log::debug!("[query/temporal] {} patterns across {} journals", patterns.len(), journals.len());
        patterns
    }
}
