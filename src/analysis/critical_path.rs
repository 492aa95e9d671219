//! Critical-path method over the task/dependency graph.
//!
//! Dates are inclusive; internally each task occupies the half-open day
//! interval `[start, end + 1)` so that a finish-to-start successor may begin
//! on the day after its predecessor's last day.
//!
//! Forward pass (topological order) computes earliest start/finish, backward
//! pass (reverse order) computes latest start/finish from the overall project
//! finish. Edges whose endpoints are missing from the input are skipped, as
//! are edges on a cycle that slipped in through external data.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{Duration, NaiveDate};

use crate::model::{Dependency, DependencyKind, ScheduleGraph, Task, TaskId, TaskStatus};

/// Per-task result of the two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSchedule {
    pub task_id: TaskId,
    pub earliest_start: NaiveDate,
    /// Last day of the earliest placement (inclusive).
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    /// Last day of the latest placement (inclusive).
    pub latest_finish: NaiveDate,
    /// `latest_start - earliest_start` in days.
    pub float_days: i64,
}

impl TaskSchedule {
    pub fn is_critical(&self) -> bool {
        self.float_days == 0
    }
}

/// Aggregate counts over the analysed tasks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScheduleStats {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Mean of `progress`, 0.0 when there are no tasks.
    pub average_progress: f32,
    /// Inclusive days from the earliest recorded start to the latest
    /// recorded end.
    pub duration_days: i64,
}

impl ScheduleStats {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut stats = Self::default();
        let mut progress_sum = 0u64;
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::NotStarted => stats.not_started += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            progress_sum += u64::from(task.progress.min(100));
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(task.start_date), hi.max(task.end_date)),
                None => (task.start_date, task.end_date),
            });
        }
        if stats.total > 0 {
            stats.average_progress = progress_sum as f32 / stats.total as f32;
        }
        if let Some((lo, hi)) = bounds {
            stats.duration_days = (hi - lo).num_days() + 1;
        }
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct CriticalPathReport {
    pub schedules: HashMap<TaskId, TaskSchedule>,
    pub critical: HashSet<TaskId>,
    pub stats: ScheduleStats,
    /// Last day of the computed project finish, if any task was analysed.
    pub project_finish: Option<NaiveDate>,
    /// Edges ignored because an endpoint was missing or on a cycle.
    pub skipped_edges: usize,
}

impl CriticalPathReport {
    pub fn is_critical(&self, id: TaskId) -> bool {
        self.critical.contains(&id)
    }

    pub fn schedule(&self, id: TaskId) -> Option<&TaskSchedule> {
        self.schedules.get(&id)
    }

    pub fn float_days(&self, id: TaskId) -> Option<i64> {
        self.schedules.get(&id).map(|s| s.float_days)
    }
}

/// Stateless; every call is a pure function of its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalPathAnalyzer;

struct Node {
    id: TaskId,
    /// Recorded start as a day offset from the epoch.
    start: i64,
    duration: i64,
}

/// Resolved edge between two local node indices.
struct Edge {
    from: usize,
    to: usize,
    kind: DependencyKind,
}

impl CriticalPathAnalyzer {
    pub fn analyze_graph(graph: &ScheduleGraph) -> CriticalPathReport {
        Self::analyze(graph.tasks_ordered(), graph.dependencies())
    }

    pub fn analyze<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        dependencies: &[Dependency],
    ) -> CriticalPathReport {
        let mut seen = HashSet::new();
        let tasks: Vec<&Task> = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
        let stats = ScheduleStats::from_tasks(tasks.iter().copied());
        let Some(epoch) = tasks.iter().map(|t| t.start_date).min() else {
            return CriticalPathReport {
                stats,
                skipped_edges: dependencies.len(),
                ..Default::default()
            };
        };

        let nodes: Vec<Node> = tasks
            .iter()
            .map(|t| Node {
                id: t.id,
                start: (t.start_date - epoch).num_days(),
                duration: t.duration_days(),
            })
            .collect();
        let local: HashMap<TaskId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut skipped = 0usize;
        let mut edges = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            match (local.get(&dep.predecessor_id), local.get(&dep.successor_id)) {
                (Some(&from), Some(&to)) if from != to => edges.push(Edge {
                    from,
                    to,
                    kind: dep.kind,
                }),
                _ => {
                    tracing::warn!(
                        dependency = %dep.id,
                        "dependency endpoint missing; treating edge as non-constraining"
                    );
                    skipped += 1;
                }
            }
        }

        let (order, cyclic) = topological_order(nodes.len(), &edges);
        if !cyclic.is_empty() {
            tracing::warn!(tasks = cyclic.len(), "dependency cycle in schedule data; affected edges ignored");
        }
        let in_cycle = |i: usize| cyclic.contains(&i);
        let edges: Vec<Edge> = edges
            .into_iter()
            .filter(|e| {
                let keep = !in_cycle(e.from) && !in_cycle(e.to);
                if !keep {
                    skipped += 1;
                }
                keep
            })
            .collect();

        let mut incoming: Vec<Vec<&Edge>> = (0..nodes.len()).map(|_| Vec::new()).collect();
        let mut outgoing: Vec<Vec<&Edge>> = (0..nodes.len()).map(|_| Vec::new()).collect();
        for edge in &edges {
            outgoing[edge.from].push(edge);
            incoming[edge.to].push(edge);
        }

        // Forward pass.
        let mut es: Vec<i64> = nodes.iter().map(|n| n.start).collect();
        let mut ef: Vec<i64> = nodes.iter().map(|n| n.start + n.duration).collect();
        for &i in &order {
            if incoming[i].is_empty() {
                continue;
            }
            let dur = nodes[i].duration;
            es[i] = incoming[i]
                .iter()
                .map(|e| match e.kind {
                    DependencyKind::FinishToStart => ef[e.from],
                    DependencyKind::StartToStart => es[e.from],
                    DependencyKind::FinishToFinish => ef[e.from] - dur,
                    DependencyKind::StartToFinish => es[e.from] - dur,
                })
                .max()
                .unwrap_or(nodes[i].start);
            ef[i] = es[i] + dur;
        }

        let finish = ef.iter().copied().max().unwrap_or(0);

        // Backward pass.
        let mut ls = es.clone();
        let mut lf = ef.clone();
        for &i in order.iter().rev() {
            if incoming[i].is_empty() && outgoing[i].is_empty() {
                // Unlinked: recorded dates are both bounds.
                continue;
            }
            let dur = nodes[i].duration;
            lf[i] = outgoing[i]
                .iter()
                .map(|e| match e.kind {
                    DependencyKind::FinishToStart => ls[e.to],
                    DependencyKind::StartToStart => ls[e.to] + dur,
                    DependencyKind::FinishToFinish => lf[e.to],
                    DependencyKind::StartToFinish => lf[e.to] + dur,
                })
                .fold(finish, i64::min);
            ls[i] = lf[i] - dur;
        }

        let day = |offset: i64| epoch + Duration::days(offset);
        let mut schedules = HashMap::with_capacity(nodes.len());
        let mut critical = HashSet::new();
        for (i, node) in nodes.iter().enumerate() {
            let schedule = TaskSchedule {
                task_id: node.id,
                earliest_start: day(es[i]),
                earliest_finish: day(ef[i] - 1),
                latest_start: day(ls[i]),
                latest_finish: day(lf[i] - 1),
                float_days: ls[i] - es[i],
            };
            debug_assert!(schedule.float_days >= 0, "negative float for {}", node.id);
            if schedule.is_critical() {
                critical.insert(node.id);
            }
            schedules.insert(node.id, schedule);
        }

        CriticalPathReport {
            schedules,
            critical,
            stats,
            project_finish: Some(day(finish - 1)),
            skipped_edges: skipped,
        }
    }
}

/// Kahn's algorithm. Returns the order covering every node (cyclic nodes are
/// appended last) and the set of nodes that could not be ordered.
fn topological_order(count: usize, edges: &[Edge]) -> (Vec<usize>, HashSet<usize>) {
    let mut in_degree = vec![0usize; count];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); count];
    for e in edges {
        in_degree[e.to] += 1;
        out[e.from].push(e.to);
    }
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &next in &out[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    let ordered: HashSet<usize> = order.iter().copied().collect();
    let cyclic: HashSet<usize> = (0..count).filter(|i| !ordered.contains(i)).collect();
    order.extend((0..count).filter(|i| cyclic.contains(i)));
    (order, cyclic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn fs(a: &Task, b: &Task) -> Dependency {
        Dependency::new(a.id, b.id, DependencyKind::FinishToStart)
    }

    #[test]
    fn linear_chain_is_fully_critical() {
        let a = Task::new("A", d(1), d(3));
        let b = Task::new("B", d(4), d(5));
        let c = Task::new("C", d(6), d(9));
        let report = CriticalPathAnalyzer::analyze([&a, &b, &c], &[fs(&a, &b), fs(&b, &c)]);

        let expected: HashSet<TaskId> = [a.id, b.id, c.id].into_iter().collect();
        assert_eq!(report.critical, expected);
        for id in [a.id, b.id, c.id] {
            assert_eq!(report.float_days(id), Some(0));
        }
        assert_eq!(report.stats.duration_days, 9);
        assert_eq!(report.project_finish, Some(d(9)));
    }

    #[test]
    fn parallel_branch_has_float() {
        let a = Task::new("A", d(1), d(2));
        let long = Task::new("Long", d(3), d(10));
        let short = Task::new("Short", d(3), d(4));
        let end = Task::new("End", d(11), d(11));
        let deps = [fs(&a, &long), fs(&a, &short), fs(&long, &end), fs(&short, &end)];
        let report = CriticalPathAnalyzer::analyze([&a, &long, &short, &end], &deps);

        assert!(report.is_critical(long.id));
        assert!(!report.is_critical(short.id));
        assert_eq!(report.float_days(short.id), Some(6));
        let s = report.schedule(short.id).unwrap();
        assert_eq!(s.latest_start, d(9));
        assert_eq!(s.latest_finish, d(10));
    }

    #[test]
    fn later_predecessor_pushes_successors_without_touching_them() {
        let a = Task::new("A", d(1), d(4));
        let b = Task::new("B", d(4), d(5));
        let c = Task::new("C", d(6), d(9));
        let report = CriticalPathAnalyzer::analyze([&a, &b, &c], &[fs(&a, &b), fs(&b, &c)]);
        assert_eq!(report.schedule(b.id).unwrap().earliest_start, d(5));
        assert_eq!(report.schedule(c.id).unwrap().earliest_start, d(7));
        assert_eq!(b.start_date, d(4));
    }

    #[rstest]
    #[case(DependencyKind::FinishToStart, d(4))]
    #[case(DependencyKind::StartToStart, d(1))]
    #[case(DependencyKind::FinishToFinish, d(2))]
    #[case(DependencyKind::StartToFinish, d(1) - Duration::days(2))]
    fn each_kind_constrains_the_right_instants(
        #[case] kind: DependencyKind,
        #[case] expected_start: NaiveDate,
    ) {
        // Predecessor Jan 1-3, successor two days long recorded much later.
        let p = Task::new("P", d(1), d(3));
        let s = Task::new("S", d(20), d(21));
        let dep = Dependency::new(p.id, s.id, kind);
        let report = CriticalPathAnalyzer::analyze([&p, &s], &[dep]);
        assert_eq!(report.schedule(s.id).unwrap().earliest_start, expected_start);
    }

    #[test]
    fn missing_endpoint_is_skipped_not_fatal() {
        let a = Task::new("A", d(1), d(3));
        let ghost = Dependency::new(a.id, Uuid::new_v4(), DependencyKind::FinishToStart);
        let report = CriticalPathAnalyzer::analyze([&a], &[ghost]);
        assert_eq!(report.skipped_edges, 1);
        assert_eq!(report.schedule(a.id).unwrap().earliest_start, d(1));
    }

    #[test]
    fn cyclic_input_does_not_hang_or_panic() {
        let a = Task::new("A", d(1), d(2));
        let b = Task::new("B", d(3), d(4));
        let report = CriticalPathAnalyzer::analyze([&a, &b], &[fs(&a, &b), fs(&b, &a)]);
        assert_eq!(report.skipped_edges, 2);
        assert_eq!(report.schedules.len(), 2);
    }

    #[test]
    fn float_is_never_negative() {
        let a = Task::new("A", d(1), d(5));
        let b = Task::new("B", d(2), d(3));
        let c = Task::new("C", d(8), d(12));
        let e = Task::new("E", d(2), d(2));
        let deps = [
            Dependency::new(a.id, b.id, DependencyKind::StartToStart),
            Dependency::new(b.id, c.id, DependencyKind::FinishToFinish),
            Dependency::new(a.id, e.id, DependencyKind::StartToFinish),
        ];
        let report = CriticalPathAnalyzer::analyze([&a, &b, &c, &e], &deps);
        assert!(report.schedules.values().all(|s| s.float_days >= 0));
    }

    #[test]
    fn stats_count_statuses_and_average_progress() {
        let mut a = Task::new("A", d(1), d(2));
        a.status = TaskStatus::Completed;
        a.progress = 100;
        let mut b = Task::new("B", d(3), d(4));
        b.status = TaskStatus::InProgress;
        b.progress = 50;
        let c = Task::new("C", d(5), d(10));
        let stats = ScheduleStats::from_tasks([&a, &b, &c]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.not_started, 1);
        assert_eq!(stats.average_progress, 50.0);
        assert_eq!(stats.duration_days, 10);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = CriticalPathAnalyzer::analyze(Vec::<&Task>::new(), &[]);
        assert!(report.critical.is_empty());
        assert_eq!(report.stats.total, 0);
        assert_eq!(report.project_finish, None);
    }
}
