//! Persistence seam.
//!
//! [`ScheduleBackend`] is the set of record operations the chart relies on.
//! The drag controller never calls it directly; it produces
//! [`MutationRequest`]s which the caller forwards with
//! [`MutationRequest::apply`]. [`InMemoryBackend`] backs the viewer and the
//! tests.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use egui::Color32;
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::model::{
    Baseline, BaselineEntry, BaselineStore, Dependency, DependencyKind, Milestone, MilestonePatch,
    ScheduleGraph, Segment, Task, TaskDraft, TaskId, TaskPatch, TaskStatus,
};

pub trait ScheduleBackend {
    // Tasks
    fn create_task(&mut self, draft: TaskDraft) -> Result<Task, ScheduleError>;
    fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), ScheduleError>;
    fn delete_task(&mut self, id: TaskId) -> Result<(), ScheduleError>;
    fn bulk_update_tasks(&mut self, ids: &[TaskId], patch: &TaskPatch) -> Result<(), ScheduleError>;
    fn bulk_delete_tasks(&mut self, ids: &[TaskId]) -> Result<(), ScheduleError>;
    fn reorder_tasks(&mut self, ordered: &[TaskId]) -> Result<(), ScheduleError>;

    // Dependencies
    fn create_dependency(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        kind: DependencyKind,
    ) -> Result<Dependency, ScheduleError>;
    fn delete_dependency(&mut self, id: Uuid) -> Result<(), ScheduleError>;

    // Milestones
    fn create_milestone(&mut self, milestone: Milestone) -> Result<Milestone, ScheduleError>;
    fn update_milestone(&mut self, id: Uuid, patch: &MilestonePatch) -> Result<(), ScheduleError>;
    fn delete_milestone(&mut self, id: Uuid) -> Result<(), ScheduleError>;

    // Baselines
    fn create_baseline(
        &mut self,
        name: &str,
        description: Option<&str>,
        snapshot: Vec<BaselineEntry>,
    ) -> Result<Baseline, ScheduleError>;
    fn delete_baseline(&mut self, id: Uuid) -> Result<(), ScheduleError>;
    fn list_baselines(&self) -> Vec<Baseline>;
}

/// A change produced by an interaction, waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    UpdateTask {
        id: TaskId,
        patch: TaskPatch,
    },
    CreateDependency {
        predecessor: TaskId,
        successor: TaskId,
        kind: DependencyKind,
    },
}

impl MutationRequest {
    pub fn apply(self, backend: &mut impl ScheduleBackend) -> Result<(), ScheduleError> {
        match self {
            Self::UpdateTask { id, patch } => backend.update_task(id, &patch),
            Self::CreateDependency {
                predecessor,
                successor,
                kind,
            } => backend
                .create_dependency(predecessor, successor, kind)
                .map(|_| ()),
        }
    }
}

/// Backend that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    graph: ScheduleGraph,
    baselines: BaselineStore,
}

impl InMemoryBackend {
    pub fn new(graph: ScheduleGraph) -> Self {
        Self {
            graph,
            baselines: BaselineStore::new(),
        }
    }

    pub fn graph(&self) -> &ScheduleGraph {
        &self.graph
    }

    /// Direct access for edits the trait does not cover, such as segments.
    pub fn graph_mut(&mut self) -> &mut ScheduleGraph {
        &mut self.graph
    }

    pub fn baselines(&self) -> &BaselineStore {
        &self.baselines
    }

    pub fn baselines_mut(&mut self) -> &mut BaselineStore {
        &mut self.baselines
    }

    /// Snapshot every task's current dates.
    pub fn capture_baseline(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Baseline, ScheduleError> {
        let snapshot = self
            .graph
            .tasks_ordered()
            .into_iter()
            .map(BaselineEntry::from)
            .collect();
        self.create_baseline(name, description, snapshot)
    }

    /// Demonstration schedule anchored on `today`.
    pub fn sample(today: NaiveDate) -> Self {
        let day = |n: i64| today + Duration::days(n);
        let task = |name: &str, start: i64, end: i64, rgb: (u8, u8, u8), owner: &str| {
            let mut t = Task::new(name, day(start), day(end));
            t.color = Some(Color32::from_rgb(rgb.0, rgb.1, rgb.2));
            t.owner = Some(owner.to_string());
            t
        };

        let mut kickoff = task("Project Kickoff", -5, -2, (70, 130, 180), "Ana");
        kickoff.status = TaskStatus::Completed;
        kickoff.progress = 100;
        let mut requirements = task("Requirements Gathering", -1, 5, (60, 179, 113), "Ana");
        requirements.status = TaskStatus::InProgress;
        requirements.progress = 60;
        let design = task("UI Design", 6, 18, (218, 112, 214), "Ben");
        let backend = task("Backend Development", 6, 28, (106, 90, 205), "Caro");
        let docs = task("Documentation", 10, 20, (210, 160, 60), "Ben");
        let testing = task("Testing & QA", 29, 34, (220, 20, 60), "Ana");

        let link = |a: &Task, b: &Task, kind| Dependency::new(a.id, b.id, kind);
        let dependencies = vec![
            link(&kickoff, &requirements, DependencyKind::FinishToStart),
            link(&requirements, &design, DependencyKind::FinishToStart),
            link(&design, &backend, DependencyKind::StartToStart),
            link(&backend, &testing, DependencyKind::FinishToStart),
            link(&design, &docs, DependencyKind::FinishToFinish),
        ];

        // Requirements pauses for a review in the middle.
        let mut segments = HashMap::new();
        segments.insert(
            requirements.id,
            vec![Segment::new(day(-1), day(1)), Segment::new(day(3), day(5))],
        );

        let milestones = vec![
            Milestone::new("Planning Complete", day(5)),
            Milestone::new("Launch", day(35)),
        ];

        let mut tasks = vec![kickoff, requirements, design, backend, docs, testing];
        for (i, t) in tasks.iter_mut().enumerate() {
            t.sort_order = i as i64;
        }

        Self::new(ScheduleGraph::from_parts(
            "Sample Project",
            tasks,
            dependencies,
            milestones,
            segments,
        ))
    }
}

impl ScheduleBackend for InMemoryBackend {
    fn create_task(&mut self, draft: TaskDraft) -> Result<Task, ScheduleError> {
        let start = draft
            .start_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let end = draft.end_date.unwrap_or(start);
        let mut task = Task::new(draft.name, start, end);
        task.status = draft.status;
        task.progress = draft.progress.min(100);
        task.owner = draft.owner;
        task.color = draft.color;
        task.category = draft.category;
        task.sort_order = self.graph.next_sort_order();
        self.graph.add_task(task).cloned()
    }

    fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), ScheduleError> {
        self.graph.update_task(id, patch)
    }

    fn delete_task(&mut self, id: TaskId) -> Result<(), ScheduleError> {
        self.graph.remove_task(id).map(|_| ())
    }

    fn bulk_update_tasks(&mut self, ids: &[TaskId], patch: &TaskPatch) -> Result<(), ScheduleError> {
        self.graph.bulk_update(ids, patch)
    }

    fn bulk_delete_tasks(&mut self, ids: &[TaskId]) -> Result<(), ScheduleError> {
        self.graph.bulk_remove(ids).map(|_| ())
    }

    fn reorder_tasks(&mut self, ordered: &[TaskId]) -> Result<(), ScheduleError> {
        self.graph.reorder(ordered);
        Ok(())
    }

    fn create_dependency(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        kind: DependencyKind,
    ) -> Result<Dependency, ScheduleError> {
        self.graph
            .add_dependency(predecessor, successor, kind)
            .cloned()
    }

    fn delete_dependency(&mut self, id: Uuid) -> Result<(), ScheduleError> {
        self.graph.remove_dependency(id).map(|_| ())
    }

    fn create_milestone(&mut self, milestone: Milestone) -> Result<Milestone, ScheduleError> {
        Ok(self.graph.add_milestone(milestone).clone())
    }

    fn update_milestone(&mut self, id: Uuid, patch: &MilestonePatch) -> Result<(), ScheduleError> {
        self.graph.update_milestone(id, patch)
    }

    fn delete_milestone(&mut self, id: Uuid) -> Result<(), ScheduleError> {
        self.graph.remove_milestone(id).map(|_| ())
    }

    fn create_baseline(
        &mut self,
        name: &str,
        description: Option<&str>,
        snapshot: Vec<BaselineEntry>,
    ) -> Result<Baseline, ScheduleError> {
        let baseline = Baseline::new(
            name,
            description.map(str::to_string),
            snapshot,
            Utc::now(),
        );
        Ok(self.baselines.insert(baseline).clone())
    }

    fn delete_baseline(&mut self, id: Uuid) -> Result<(), ScheduleError> {
        self.baselines.remove(id).map(|_| ())
    }

    fn list_baselines(&self) -> Vec<Baseline> {
        self.baselines.list().into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CriticalPathAnalyzer;
    use crate::error::LinkRejection;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn draft(name: &str, start: u32, end: u32) -> TaskDraft {
        TaskDraft {
            name: name.to_string(),
            start_date: Some(d(start)),
            end_date: Some(d(end)),
            ..Default::default()
        }
    }

    #[test]
    fn created_tasks_append_to_the_order() {
        let mut backend = InMemoryBackend::default();
        let a = backend.create_task(draft("A", 1, 3)).unwrap();
        let b = backend.create_task(draft("B", 4, 6)).unwrap();
        assert!(b.sort_order > a.sort_order);
        let names: Vec<&str> = backend
            .graph()
            .tasks_ordered()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn inverted_draft_is_refused() {
        let mut backend = InMemoryBackend::default();
        let err = backend.create_task(draft("A", 5, 2)).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDateRange { .. }));
        assert!(backend.graph().is_empty());
    }

    #[test]
    fn requests_apply_through_the_trait() {
        let mut backend = InMemoryBackend::default();
        let a = backend.create_task(draft("A", 1, 3)).unwrap().id;
        let b = backend.create_task(draft("B", 4, 6)).unwrap().id;

        MutationRequest::UpdateTask {
            id: a,
            patch: TaskPatch::dates(d(2), d(4)),
        }
        .apply(&mut backend)
        .unwrap();
        MutationRequest::CreateDependency {
            predecessor: a,
            successor: b,
            kind: DependencyKind::FinishToStart,
        }
        .apply(&mut backend)
        .unwrap();

        let task = backend.graph().task(a).unwrap();
        assert_eq!((task.start_date, task.end_date), (d(2), d(4)));
        assert_eq!(backend.graph().dependencies().len(), 1);

        let err = MutationRequest::CreateDependency {
            predecessor: b,
            successor: a,
            kind: DependencyKind::FinishToStart,
        }
        .apply(&mut backend)
        .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::LinkRejected(LinkRejection::WouldCycle)
        ));
    }

    #[test]
    fn deleting_a_task_drops_its_dependencies() {
        let mut backend = InMemoryBackend::default();
        let a = backend.create_task(draft("A", 1, 3)).unwrap().id;
        let b = backend.create_task(draft("B", 4, 6)).unwrap().id;
        backend
            .create_dependency(a, b, DependencyKind::FinishToStart)
            .unwrap();
        backend.delete_task(a).unwrap();
        assert!(backend.graph().dependencies().is_empty());
        assert!(matches!(
            backend.delete_task(a),
            Err(ScheduleError::TaskNotFound(_))
        ));
    }

    #[test]
    fn baselines_freeze_dates() {
        let mut backend = InMemoryBackend::default();
        let a = backend.create_task(draft("A", 1, 3)).unwrap().id;
        let baseline = backend.capture_baseline("v1", Some("kickoff")).unwrap();
        backend
            .update_task(a, &TaskPatch::dates(d(10), d(12)))
            .unwrap();

        let listed = backend.list_baselines();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].description(), Some("kickoff"));
        assert_eq!(listed[0].entry(a).map(|e| e.start_date), Some(d(1)));

        backend.delete_baseline(baseline.id()).unwrap();
        assert!(backend.list_baselines().is_empty());
    }

    #[test]
    fn milestone_crud() {
        let mut backend = InMemoryBackend::default();
        let m = backend.create_milestone(Milestone::new("Go", d(5))).unwrap();
        backend
            .update_milestone(
                m.id,
                &MilestonePatch {
                    date: Some(d(7)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(backend.graph().milestone(m.id).map(|m| m.date), Some(d(7)));
        backend.delete_milestone(m.id).unwrap();
        assert!(backend.graph().milestones().is_empty());
    }

    #[test]
    fn sample_is_acyclic_and_fully_linked() {
        let backend = InMemoryBackend::sample(d(10));
        let report = CriticalPathAnalyzer::analyze_graph(backend.graph());
        assert_eq!(report.skipped_edges, 0);
        assert_eq!(report.schedules.len(), backend.graph().task_count());
        assert!(!report.critical.is_empty());
    }
}
