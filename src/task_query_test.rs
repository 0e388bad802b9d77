// Task query tests

#[cfg(test)]
mod tests {
    use std::fs;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use crate::graph::{build_index, scanner, GraphIndex};
    use crate::outline::{parse_outline, TaskStatus};
    use crate::query::tasks::{due_date, TaskQuery, TaskRecord};
    use crate::query::temporal::DateRange;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task_graph() -> (TempDir, GraphIndex) {
        let temp_dir = TempDir::new().unwrap();
        let files = [
            (
                "journals/2025_01_13.md",
                "- TODO Write report\n  scheduled:: <2025-01-15 Wed>\n- DONE Email Bob\n- LATER Plan trip\n  deadline:: 2025-02-30\n",
            ),
            ("journals/2025_01_20.md", "- TODO Call plumber\n  deadline:: 2025-01-17\n"),
            ("journals/2025_01_21.md", "- just notes\n"),
            ("pages/Project.md", "- TODO Draft outline\n  scheduled:: 20250114\n- NOW Review code\n"),
        ];
        for (rel, content) in files {
            let path = temp_dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let paths = scanner::list_markdown_files(temp_dir.path());
        let index = build_index(&paths, temp_dir.path());
        (temp_dir, index)
    }

    fn contents(tasks: &[TaskRecord]) -> Vec<&str> {
        tasks.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn test_query_tasks_by_status() {
        let (_dir, index) = task_graph();
        let todos = index.query_tasks_by_status(TaskStatus::Todo, &TaskQuery::default());
        assert_eq!(
            contents(&todos),
            vec!["TODO Write report", "TODO Call plumber", "TODO Draft outline"]
        );
        assert_eq!(todos[2].page_name, "Project");
        assert_eq!(todos[2].block_index, 0);
        assert!(todos.iter().all(|t| t.status == TaskStatus::Todo));

        assert!(index
            .query_tasks_by_status(TaskStatus::Waiting, &TaskQuery::default())
            .is_empty());
    }

    #[test]
    fn test_query_tasks_by_status_for_one_page() {
        let (_dir, index) = task_graph();
        let query = TaskQuery {
            page_name: Some("Project".to_string()),
            date_range: None,
        };
        let found = index.query_tasks_by_status(TaskStatus::Todo, &query);
        assert_eq!(contents(&found), vec!["TODO Draft outline"]);
    }

    #[test]
    fn test_query_tasks_by_status_in_date_range_skips_regular_pages() {
        let (_dir, index) = task_graph();
        let query = TaskQuery {
            page_name: None,
            date_range: Some(DateRange::new(day(2025, 1, 10), day(2025, 1, 15))),
        };
        let found = index.query_tasks_by_status(TaskStatus::Todo, &query);
        assert_eq!(contents(&found), vec!["TODO Write report"]);
    }

    #[test]
    fn test_query_tasks_by_page() {
        let (_dir, index) = task_graph();
        let found = index.query_tasks_by_page("Project");
        let statuses: Vec<TaskStatus> = found.iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec![TaskStatus::Todo, TaskStatus::Now]);
        assert!(index.query_tasks_by_page("Missing").is_empty());
    }

    #[test]
    fn test_query_tasks_by_date_range_newest_journal_first() {
        let (_dir, index) = task_graph();
        let found = index.query_tasks_by_date_range(day(2025, 1, 13), day(2025, 1, 20));
        assert_eq!(
            contents(&found),
            vec!["TODO Call plumber", "TODO Write report", "DONE Email Bob", "LATER Plan trip"]
        );
    }

    #[test]
    fn test_tasks_due_between_sorted_by_due_date() {
        let (_dir, index) = task_graph();
        let due = index.query_tasks_due_between(day(2025, 1, 13), day(2025, 1, 19));
        assert_eq!(
            contents(&due),
            vec!["TODO Draft outline", "TODO Write report", "TODO Call plumber"]
        );
        assert_eq!(due[0].due_date, Some(day(2025, 1, 14)));

        let this_week = index.query_tasks_due_this_week(Some(day(2025, 1, 16)));
        assert_eq!(contents(&this_week), contents(&due));
    }

    #[test]
    fn test_due_date_parsing() {
        let blocks = parse_outline(
            "- TODO a\n  scheduled:: <2025-01-15 Wed>\n- TODO b\n  deadline:: 2025-02-30\n- TODO c\n  deadline:: soon\n- TODO d",
        );
        let dates: Vec<Option<NaiveDate>> = blocks.iter().map(due_date).collect();
        assert_eq!(dates, vec![Some(day(2025, 1, 15)), None, None, None]);
    }

    #[test]
    fn test_task_summary() {
        let (_dir, index) = task_graph();
        let summary = index.get_task_summary(day(2025, 1, 13)).unwrap();
        assert_eq!(summary.date, "2025-01-13");
        assert_eq!(summary.page_name, "journals/2025_01_13");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.counts[&TaskStatus::Todo], 1);
        assert_eq!(summary.counts[&TaskStatus::Done], 1);
        assert_eq!(summary.counts[&TaskStatus::Later], 1);
        assert_eq!(summary.counts[&TaskStatus::Canceled], 0);
        assert_eq!(summary.tasks.len(), 3);

        assert!(index.get_task_summary(day(2025, 1, 21)).is_none());
        assert!(index.get_task_summary(day(2025, 1, 22)).is_none());
    }
}
