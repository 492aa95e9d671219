use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskId};
use crate::error::ScheduleError;

/// Frozen dates of one task at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub task_id: TaskId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<&Task> for BaselineEntry {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            start_date: task.start_date,
            end_date: task.end_date,
        }
    }
}

/// A named, timestamped snapshot of task dates.
///
/// Fields are private: a baseline cannot be edited once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    entries: Vec<BaselineEntry>,
}

impl Baseline {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        entries: Vec<BaselineEntry>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            created_at,
            entries,
        }
    }

    /// Snapshot the given tasks as they are right now.
    pub fn capture<'a>(
        name: impl Into<String>,
        description: Option<String>,
        tasks: impl IntoIterator<Item = &'a Task>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let entries = tasks.into_iter().map(BaselineEntry::from).collect();
        Self::new(name, description, entries, created_at)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    pub fn entry(&self, task_id: TaskId) -> Option<&BaselineEntry> {
        self.entries.iter().find(|e| e.task_id == task_id)
    }

    /// Index the entries by task id.
    pub fn index(&self) -> HashMap<TaskId, BaselineEntry> {
        self.entries.iter().map(|e| (e.task_id, *e)).collect()
    }
}

/// History of captured baselines with at most one selected for comparison.
#[derive(Debug, Clone, Default)]
pub struct BaselineStore {
    baselines: Vec<Baseline>,
    selected: Option<Uuid>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, baseline: Baseline) -> &Baseline {
        tracing::info!(
            baseline = %baseline.id,
            name = baseline.name.as_str(),
            tasks = baseline.entries.len(),
            "baseline captured"
        );
        self.baselines.push(baseline);
        &self.baselines[self.baselines.len() - 1]
    }

    /// Remove a baseline. Clears the selection if it pointed at it.
    pub fn remove(&mut self, id: Uuid) -> Result<Baseline, ScheduleError> {
        let pos = self
            .baselines
            .iter()
            .position(|b| b.id == id)
            .ok_or(ScheduleError::BaselineNotFound(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(self.baselines.remove(pos))
    }

    /// Baselines newest first.
    pub fn list(&self) -> Vec<&Baseline> {
        let mut out: Vec<&Baseline> = self.baselines.iter().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn get(&self, id: Uuid) -> Option<&Baseline> {
        self.baselines.iter().find(|b| b.id == id)
    }

    /// Select a baseline for comparison, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<Uuid>) -> Result<(), ScheduleError> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(ScheduleError::BaselineNotFound(id));
            }
        }
        self.selected = id;
        Ok(())
    }

    pub fn selected(&self) -> Option<&Baseline> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}
