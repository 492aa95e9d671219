//! Owner overload detection.
//!
//! Reports days on which an owner has more concurrent tasks than the
//! threshold allows. Nothing is re-scheduled.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::model::{Task, TaskId, TaskStatus};

/// A contiguous run of overloaded days for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadWindow {
    pub owner: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Highest number of concurrent tasks inside the window.
    pub peak: usize,
    /// Every task active on at least one day of the window.
    pub task_ids: Vec<TaskId>,
}

/// Find overload windows. Completed tasks and tasks without an owner are
/// ignored. Output is ordered by owner, then start date.
pub fn detect_overload<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    max_concurrent: usize,
) -> Vec<OverloadWindow> {
    let mut by_owner: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if task.status == TaskStatus::Completed {
            continue;
        }
        if let Some(owner) = task.owner.as_deref().filter(|o| !o.is_empty()) {
            by_owner.entry(owner).or_default().push(task);
        }
    }

    let mut windows = Vec::new();
    for (owner, owned) in by_owner {
        // Day -> tasks active that day, for overloaded days only.
        let mut days: BTreeMap<NaiveDate, Vec<TaskId>> = BTreeMap::new();
        for task in &owned {
            for day in task.start_date.iter_days().take_while(|d| *d <= task.end_date) {
                days.entry(day).or_default().push(task.id);
            }
        }
        days.retain(|_, ids| ids.len() > max_concurrent);

        let mut current: Option<OverloadWindow> = None;
        for (day, ids) in days {
            let adjacent = matches!(&current, Some(w) if w.end + Duration::days(1) == day);
            if adjacent {
                if let Some(w) = current.as_mut() {
                    w.end = day;
                    w.peak = w.peak.max(ids.len());
                    for id in ids {
                        if !w.task_ids.contains(&id) {
                            w.task_ids.push(id);
                        }
                    }
                }
                continue;
            }
            windows.extend(current.replace(OverloadWindow {
                owner: owner.to_string(),
                start: day,
                end: day,
                peak: ids.len(),
                task_ids: ids,
            }));
        }
        windows.extend(current);
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn owned(name: &str, owner: &str, start: u32, end: u32) -> Task {
        let mut t = Task::new(name, d(start), d(end));
        t.owner = Some(owner.to_string());
        t
    }

    #[test]
    fn overlapping_tasks_for_one_owner_form_a_window() {
        let a = owned("A", "kim", 1, 5);
        let b = owned("B", "kim", 4, 8);
        let c = owned("C", "lee", 1, 10);
        let windows = detect_overload([&a, &b, &c], 1);
        assert_eq!(
            windows,
            vec![OverloadWindow {
                owner: "kim".into(),
                start: d(4),
                end: d(5),
                peak: 2,
                task_ids: vec![a.id, b.id],
            }]
        );
    }

    #[test]
    fn completed_and_unowned_tasks_do_not_count() {
        let a = owned("A", "kim", 1, 5);
        let mut b = owned("B", "kim", 1, 5);
        b.status = TaskStatus::Completed;
        let c = Task::new("C", d(1), d(5));
        assert!(detect_overload([&a, &b, &c], 1).is_empty());
    }

    #[test]
    fn separate_overlaps_give_separate_windows() {
        let a = owned("A", "kim", 1, 10);
        let b = owned("B", "kim", 2, 2);
        let c = owned("C", "kim", 8, 8);
        let windows = detect_overload([&a, &b, &c], 1);
        assert_eq!(windows.len(), 2);
        assert_eq!((windows[0].start, windows[0].end), (d(2), d(2)));
        assert_eq!((windows[1].start, windows[1].end), (d(8), d(8)));
    }
}
