use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::temporal::{iso_date, journal_date, journal_page_name, today, week_containing, DateRange};
use crate::graph::{GraphIndex, Page};
use crate::outline::{Block, TaskStatus};

/// `2025-01-10`, `<2025-01-10 Fri>` or `20250110`.
static DUE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-?(\d{2})-?(\d{2})").unwrap());

const DUE_PROPERTIES: [&str; 2] = ["scheduled", "deadline"];

/// A task block annotated with where it lives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub page_name: String,
    pub block_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub status: TaskStatus,
    pub properties: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskRecord {
    fn from_block(page: &Page, block_index: usize, block: &Block, status: TaskStatus) -> Self {
        Self {
            page_name: page.name.clone(),
            block_index,
            id: block.id.clone(),
            content: block.content.clone(),
            status,
            properties: block.properties.clone(),
            due_date: due_date(block),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub page_name: Option<String>,
    /// Keeps only journal pages dated inside the range.
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub date: String,
    pub page_name: String,
    pub counts: BTreeMap<TaskStatus, usize>,
    pub total: usize,
    pub tasks: Vec<TaskRecord>,
}

/// First parseable date in the block's `scheduled` or `deadline` property.
pub fn due_date(block: &Block) -> Option<NaiveDate> {
    DUE_PROPERTIES.iter().find_map(|key| {
        let value = block.properties.get(*key)?;
        let caps = DUE_DATE.captures(value)?;
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn page_tasks(page: &Page) -> impl Iterator<Item = TaskRecord> + '_ {
    page.blocks
        .iter()
        .enumerate()
        .filter_map(move |(index, block)| {
            block
                .task_status
                .map(|status| TaskRecord::from_block(page, index, block, status))
        })
}

impl GraphIndex {
    /// Tasks with `status`, optionally limited to one page and/or a journal date range.
    pub fn query_tasks_by_status(&self, status: TaskStatus, query: &TaskQuery) -> Vec<TaskRecord> {
        let Some(pages) = self.tasks.get(&status) else {
            return Vec::new();
        };

        pages
            .iter()
            .filter(|name| query.page_name.as_deref().map_or(true, |wanted| wanted == name.as_str()))
            .filter(|name| match query.date_range {
                Some(range) => journal_date(name).is_some_and(|date| range.contains(date)),
                None => true,
            })
            .filter_map(|name| self.pages.get(name))
            .flat_map(page_tasks)
            .filter(|task| task.status == status)
            .collect()
    }

    pub fn query_tasks_by_page(&self, page_name: &str) -> Vec<TaskRecord> {
        self.pages
            .get(page_name)
            .map(|page| page_tasks(page).collect())
            .unwrap_or_default()
    }

    /// Every task on journals inside `[start, end]`, newest journal first.
    pub fn query_tasks_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<TaskRecord> {
        self.query_journals_by_date_range(start, end)
            .into_iter()
            .flat_map(|entry| page_tasks(entry.page))
            .collect()
    }

    /// Tasks whose scheduled or deadline date falls inside `[start, end]`, earliest first.
    pub fn query_tasks_due_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<TaskRecord> {
        let range = DateRange::new(start, end);
        let mut due: Vec<TaskRecord> = self
            .pages
            .values()
            .flat_map(page_tasks)
            .filter(|task| task.due_date.is_some_and(|date| range.contains(date)))
            .collect();
        due.sort_by_key(|task| task.due_date);
        due
    }

    /// Tasks due Monday through Sunday of the week containing `reference` (default: today).
    pub fn query_tasks_due_this_week(&self, reference: Option<NaiveDate>) -> Vec<TaskRecord> {
        let week = week_containing(reference.unwrap_or_else(today));
        self.query_tasks_due_between(week.start, week.end)
    }

    /// Per-status counts and the task list of one journal day. `None` if that day has no tasks.
    pub fn get_task_summary(&self, date: NaiveDate) -> Option<TaskSummary> {
        let page_name = journal_page_name(date);
        let page = self.pages.get(&page_name)?;
        let tasks: Vec<TaskRecord> = page_tasks(page).collect();
        if tasks.is_empty() {
            return None;
        }

        let mut counts = TaskStatus::zeroed_counts();
        for task in &tasks {
            *counts.entry(task.status).or_insert(0) += 1;
        }

        Some(TaskSummary {
            date: iso_date(date),
            page_name,
            counts,
            total: tasks.len(),
            tasks,
        })
    }
}
