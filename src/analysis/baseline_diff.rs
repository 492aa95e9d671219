use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{Baseline, Task, TaskId};

/// Slip of a live task against its baseline, in days. Positive is late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variance {
    pub start_days: i64,
    pub finish_days: i64,
}

/// Lookup of frozen dates for the selected baseline.
///
/// With no baseline selected every lookup misses. Tasks created after the
/// capture have no entry and therefore no ghost bar.
#[derive(Debug, Clone, Default)]
pub struct BaselineDiff {
    frozen: HashMap<TaskId, (NaiveDate, NaiveDate)>,
}

impl BaselineDiff {
    pub fn new(selected: Option<&Baseline>) -> Self {
        let frozen = selected
            .map(|b| {
                b.entries()
                    .iter()
                    .map(|e| (e.task_id, (e.start_date, e.end_date)))
                    .collect()
            })
            .unwrap_or_default();
        Self { frozen }
    }

    pub fn lookup(&self, task_id: TaskId) -> Option<(NaiveDate, NaiveDate)> {
        self.frozen.get(&task_id).copied()
    }

    pub fn variance(&self, task: &Task) -> Option<Variance> {
        self.lookup(task.id).map(|(start, end)| Variance {
            start_days: (task.start_date - start).num_days(),
            finish_days: (task.end_date - end).num_days(),
        })
    }

    pub fn is_active(&self) -> bool {
        !self.frozen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScheduleGraph, TaskPatch};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    #[test]
    fn baseline_survives_live_edits() {
        let mut graph = ScheduleGraph::new("p");
        let id = graph.add_task(Task::new("A", d(1), d(5))).unwrap().id;
        let baseline = Baseline::capture("v1", None, graph.tasks_ordered(), Utc::now());

        graph.update_task(id, &TaskPatch::dates(d(3), d(9))).unwrap();

        let diff = BaselineDiff::new(Some(&baseline));
        assert_eq!(diff.lookup(id), Some((d(1), d(5))));
        assert_eq!(
            diff.variance(graph.task(id).unwrap()),
            Some(Variance {
                start_days: 2,
                finish_days: 4,
            })
        );
    }

    #[test]
    fn new_tasks_and_no_selection_have_no_ghost() {
        let old = Task::new("Old", d(1), d(2));
        let baseline = Baseline::capture("v1", None, [&old], Utc::now());
        let fresh = Task::new("New", d(3), d(4));

        assert_eq!(BaselineDiff::new(Some(&baseline)).lookup(fresh.id), None);
        assert_eq!(BaselineDiff::new(None).lookup(old.id), None);
    }
}
