//! Pointer-driven editing of task dates and dependencies.
//!
//! [`DragController`] is an explicit state machine:
//!
//! ```text
//! Idle ──down on body──────▶ MovingTask ─┐
//!      ──down on handle────▶ ResizingStart / ResizingEnd ─┤── up ──▶ Committed ─▶ Idle
//!      ──down on connector─▶ LinkingDependency ──────────┘── esc ─▶ Cancelled ─▶ Idle
//! ```
//!
//! Previews never touch the schedule. The committed graph is only read, and
//! only the pre-drag values are used, so a drag needs no locking. The global
//! pointer listener is attached exactly while [`DragController::is_active`]
//! returns true.

use chrono::{Duration, NaiveDate};
use egui::Pos2;

use super::callbacks::InteractionCallbacks;
use super::hit::{Anchor, BarRegion, HitZones};
use crate::backend::MutationRequest;
use crate::model::{DependencyKind, ScheduleGraph, TaskId, TaskPatch, TimelineProjector};
use crate::render::ChartLayout;

/// How a date drag reshapes the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    ResizeStart,
    ResizeEnd,
}

/// Preview dates for a drag of `delta_days`.
///
/// Resizing never produces a range shorter than one day: a start dragged
/// past the end is pinned to the end, and vice versa.
pub fn preview_dates(
    mode: DragMode,
    start: NaiveDate,
    end: NaiveDate,
    delta_days: i64,
) -> (NaiveDate, NaiveDate) {
    let delta = Duration::days(delta_days);
    match mode {
        DragMode::Move => (start + delta, end + delta),
        DragMode::ResizeStart => ((start + delta).min(end), end),
        DragMode::ResizeEnd => (start, (end + delta).max(start)),
    }
}

/// An in-flight move or resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateDrag {
    pub task_id: TaskId,
    pub original_start: NaiveDate,
    pub original_end: NaiveDate,
    /// Pointer x at pointer-down.
    pub origin_x: f32,
    pub preview_start: NaiveDate,
    pub preview_end: NaiveDate,
}

impl DateDrag {
    fn new(task_id: TaskId, start: NaiveDate, end: NaiveDate, origin_x: f32) -> Self {
        Self {
            task_id,
            original_start: start,
            original_end: end,
            origin_x,
            preview_start: start,
            preview_end: end,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.preview_start != self.original_start || self.preview_end != self.original_end
    }
}

/// An in-flight drag-to-link. Only used for drawing the floating line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkDrag {
    pub predecessor: TaskId,
    pub anchor: Anchor,
    pub origin: Pos2,
    pub pointer: Pos2,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    MovingTask(DateDrag),
    ResizingStart(DateDrag),
    ResizingEnd(DateDrag),
    LinkingDependency(LinkDrag),
}

impl DragState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MovingTask(_) => "moving",
            Self::ResizingStart(_) => "resizing-start",
            Self::ResizingEnd(_) => "resizing-end",
            Self::LinkingDependency(_) => "linking",
        }
    }

    fn date_drag(&self) -> Option<(DragMode, &DateDrag)> {
        match self {
            Self::MovingTask(d) => Some((DragMode::Move, d)),
            Self::ResizingStart(d) => Some((DragMode::ResizeStart, d)),
            Self::ResizingEnd(d) => Some((DragMode::ResizeEnd, d)),
            _ => None,
        }
    }

    fn date_drag_mut(&mut self) -> Option<(DragMode, &mut DateDrag)> {
        match self {
            Self::MovingTask(d) => Some((DragMode::Move, d)),
            Self::ResizingStart(d) => Some((DragMode::ResizeStart, d)),
            Self::ResizingEnd(d) => Some((DragMode::ResizeEnd, d)),
            _ => None,
        }
    }
}

/// Final dates of a committed move or resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCommit {
    pub task_id: TaskId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateCommit {
    pub fn into_request(self) -> MutationRequest {
        MutationRequest::UpdateTask {
            id: self.task_id,
            patch: TaskPatch::dates(self.start, self.end),
        }
    }
}

/// A released drag-to-link waiting for the caller to pick a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRequest {
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub from_anchor: Anchor,
    pub to_anchor: Anchor,
}

impl LinkRequest {
    /// Type implied by the two ends the gesture joined.
    pub fn suggested_kind(&self) -> DependencyKind {
        match (self.from_anchor, self.to_anchor) {
            (Anchor::End, Anchor::Start) => DependencyKind::FinishToStart,
            (Anchor::Start, Anchor::Start) => DependencyKind::StartToStart,
            (Anchor::End, Anchor::End) => DependencyKind::FinishToFinish,
            (Anchor::Start, Anchor::End) => DependencyKind::StartToFinish,
        }
    }

    /// Turn the request into a creation request once a type is chosen.
    ///
    /// Runs the cycle check against the committed graph; a refusal is handed
    /// to `on_dependency_create_rejected` and nothing is requested.
    pub fn confirm(
        &self,
        kind: DependencyKind,
        graph: &ScheduleGraph,
        callbacks: &mut impl InteractionCallbacks,
    ) -> Option<MutationRequest> {
        match graph.check_link(self.predecessor, self.successor) {
            Ok(()) => Some(MutationRequest::CreateDependency {
                predecessor: self.predecessor,
                successor: self.successor,
                kind,
            }),
            Err(reason) => {
                tracing::warn!(
                    predecessor = %self.predecessor,
                    successor = %self.successor,
                    %reason,
                    "link refused"
                );
                callbacks.on_dependency_create_rejected(reason);
                None
            }
        }
    }
}

/// What a finished interaction produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Committed(DateCommit),
    LinkRequested(LinkRequest),
    /// Released without moving by a whole day.
    Unchanged,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
    zones: Option<HitZones>,
}

impl DragController {
    pub fn new(zones: HitZones) -> Self {
        Self {
            state: DragState::Idle,
            zones: Some(zones),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// True while an interaction is in progress, which is exactly when the
    /// global pointer listener should be attached.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Dates to draw for `task_id` right now, if it is being dragged.
    pub fn preview_for(&self, task_id: TaskId) -> Option<(NaiveDate, NaiveDate)> {
        self.state
            .date_drag()
            .filter(|(_, d)| d.task_id == task_id)
            .map(|(_, d)| (d.preview_start, d.preview_end))
    }

    /// The floating link line, from origin anchor to pointer.
    pub fn link_line(&self) -> Option<(Pos2, Pos2)> {
        match &self.state {
            DragState::LinkingDependency(link) => Some((link.origin, link.pointer)),
            _ => None,
        }
    }

    pub fn set_zones(&mut self, zones: HitZones) {
        self.zones = Some(zones);
    }

    fn zones(&self) -> HitZones {
        self.zones.unwrap_or(HitZones {
            handle_width: 7.0,
            connector_radius: 5.0,
            connector_offset: 9.0,
        })
    }

    /// Pointer pressed. Starts an interaction when `pos` is over a bar.
    ///
    /// A press while another interaction is active cancels that one first.
    /// Returns whether a new interaction started.
    pub fn pointer_down(&mut self, pos: Pos2, layout: &ChartLayout, graph: &ScheduleGraph) -> bool {
        if self.is_active() {
            tracing::debug!(state = self.state.name(), "superseded by new pointer-down");
            self.cancel();
        }
        let zones = self.zones();
        let Some(hit) = zones.hit_test(layout, pos) else {
            return false;
        };
        let Some(task) = graph.task(hit.task_id) else {
            return false;
        };
        let drag = DateDrag::new(task.id, task.start_date, task.end_date, pos.x);
        let next = match hit.region {
            BarRegion::Body => DragState::MovingTask(drag),
            BarRegion::StartHandle => DragState::ResizingStart(drag),
            BarRegion::EndHandle => DragState::ResizingEnd(drag),
            BarRegion::Connector(anchor) => {
                let Some(geometry) = layout.task(task.id) else {
                    return false;
                };
                let origin = zones.connector_center(geometry.rect, anchor);
                DragState::LinkingDependency(LinkDrag {
                    predecessor: task.id,
                    anchor,
                    origin,
                    pointer: pos,
                })
            }
        };
        self.enter(next);
        true
    }

    /// Pointer moved while captured. Recomputes the preview and reports it
    /// when it changed by at least a day.
    pub fn pointer_move(
        &mut self,
        pos: Pos2,
        projector: &TimelineProjector,
        callbacks: &mut impl InteractionCallbacks,
    ) {
        if let DragState::LinkingDependency(link) = &mut self.state {
            link.pointer = pos;
            return;
        }
        let Some((mode, drag)) = self.state.date_drag_mut() else {
            return;
        };
        let delta_days = projector.days_for(pos.x - drag.origin_x);
        let (start, end) = preview_dates(mode, drag.original_start, drag.original_end, delta_days);
        if (start, end) != (drag.preview_start, drag.preview_end) {
            drag.preview_start = start;
            drag.preview_end = end;
            callbacks.on_task_dates_previewed(drag.task_id, start, end);
        }
    }

    /// Pointer released. Ends the interaction and returns what it produced.
    pub fn pointer_up(
        &mut self,
        pos: Pos2,
        layout: &ChartLayout,
        projector: &TimelineProjector,
        callbacks: &mut impl InteractionCallbacks,
    ) -> DragOutcome {
        self.pointer_move(pos, projector, callbacks);
        let state = std::mem::take(&mut self.state);
        let outcome = match state {
            DragState::Idle => return DragOutcome::Unchanged,
            DragState::LinkingDependency(link) => self.finish_link(link, pos, layout, callbacks),
            other => match other.date_drag() {
                Some((_, drag)) if drag.is_changed() => {
                    callbacks.on_task_dates_committed(drag.task_id, drag.preview_start, drag.preview_end);
                    DragOutcome::Committed(DateCommit {
                        task_id: drag.task_id,
                        start: drag.preview_start,
                        end: drag.preview_end,
                    })
                }
                _ => DragOutcome::Unchanged,
            },
        };
        tracing::debug!(from = state.name(), ?outcome, "pointer listener detached");
        outcome
    }

    /// Abort the active interaction without any side effect.
    pub fn cancel(&mut self) -> DragOutcome {
        if !self.is_active() {
            return DragOutcome::Unchanged;
        }
        let state = std::mem::take(&mut self.state);
        tracing::debug!(from = state.name(), "interaction cancelled; pointer listener detached");
        DragOutcome::Cancelled
    }

    fn enter(&mut self, next: DragState) {
        tracing::debug!(to = next.name(), "pointer listener attached");
        self.state = next;
    }

    fn finish_link(
        &self,
        link: LinkDrag,
        pos: Pos2,
        layout: &ChartLayout,
        callbacks: &mut impl InteractionCallbacks,
    ) -> DragOutcome {
        match self.zones().hit_test(layout, pos) {
            Some(hit) if hit.task_id != link.predecessor => match hit.region {
                BarRegion::Connector(to_anchor) => {
                    callbacks.on_dependency_link_requested(link.predecessor, hit.task_id);
                    DragOutcome::LinkRequested(LinkRequest {
                        predecessor: link.predecessor,
                        successor: hit.task_id,
                        from_anchor: link.anchor,
                        to_anchor,
                    })
                }
                _ => DragOutcome::Cancelled,
            },
            _ => DragOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BaselineDiff, CriticalPathReport};
    use crate::config::ChartSettings;
    use crate::error::LinkRejection;
    use crate::interaction::callbacks::{InteractionEvent, RecordingCallbacks};
    use crate::model::{Task, ViewGranularity};
    use chrono::Weekday;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    struct Fixture {
        graph: ScheduleGraph,
        projector: TimelineProjector,
        layout: ChartLayout,
        a: TaskId,
        b: TaskId,
    }

    /// Two tasks on a 10 px/day scale starting Jan 1 at x = 0.
    fn fixture() -> Fixture {
        let settings = ChartSettings::default();
        let mut graph = ScheduleGraph::new("g");
        let a = graph.add_task(Task::new("A", d(3), d(7))).unwrap().id;
        let b = graph.add_task(Task::new("B", d(10), d(12))).unwrap().id;
        let projector =
            TimelineProjector::new(d(1), d(31), ViewGranularity::Day, Weekday::Mon, d(1))
                .with_pixels_per_day(10.0);
        let tasks = graph.tasks_ordered();
        let layout = ChartLayout::build(
            &graph,
            &tasks,
            &projector,
            &CriticalPathReport::default(),
            &BaselineDiff::default(),
            &settings,
        );
        Fixture {
            graph,
            projector,
            layout,
            a,
            b,
        }
    }

    fn controller() -> DragController {
        DragController::new(HitZones::from(&ChartSettings::default()))
    }

    #[rstest]
    #[case(DragMode::Move, 2, (d(5), d(9)))]
    #[case(DragMode::Move, -2, (d(1), d(5)))]
    #[case(DragMode::ResizeStart, 2, (d(5), d(7)))]
    #[case(DragMode::ResizeStart, 10, (d(7), d(7)))]
    #[case(DragMode::ResizeEnd, -1, (d(3), d(6)))]
    #[case(DragMode::ResizeEnd, -10, (d(3), d(3)))]
    fn preview_policy(
        #[case] mode: DragMode,
        #[case] delta: i64,
        #[case] expected: (NaiveDate, NaiveDate),
    ) {
        assert_eq!(preview_dates(mode, d(3), d(7), delta), expected);
    }

    #[test]
    fn move_previews_then_commits_without_touching_graph() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();

        // Body of A spans x 20..70 on row 0 (y 5..25).
        assert!(ctl.pointer_down(Pos2::new(40.0, 15.0), &f.layout, &f.graph));
        assert!(matches!(ctl.state(), DragState::MovingTask(_)));
        ctl.pointer_move(Pos2::new(54.0, 15.0), &f.projector, &mut cb);
        ctl.pointer_move(Pos2::new(58.0, 15.0), &f.projector, &mut cb);
        assert_eq!(ctl.preview_for(f.a), Some((d(5), d(9))));
        assert_eq!(f.graph.task(f.a).unwrap().start_date, d(3));

        let outcome = ctl.pointer_up(Pos2::new(60.0, 15.0), &f.layout, &f.projector, &mut cb);
        assert_eq!(
            outcome,
            DragOutcome::Committed(DateCommit {
                task_id: f.a,
                start: d(5),
                end: d(9),
            })
        );
        assert!(!ctl.is_active());
        assert_eq!(
            cb.events,
            vec![
                InteractionEvent::Previewed {
                    task_id: f.a,
                    start: d(4),
                    end: d(8),
                },
                InteractionEvent::Previewed {
                    task_id: f.a,
                    start: d(5),
                    end: d(9),
                },
                InteractionEvent::Committed {
                    task_id: f.a,
                    start: d(5),
                    end: d(9),
                },
            ]
        );
    }

    #[test]
    fn resize_start_past_end_pins_to_one_day() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();
        assert!(ctl.pointer_down(Pos2::new(21.0, 15.0), &f.layout, &f.graph));
        assert!(matches!(ctl.state(), DragState::ResizingStart(_)));
        let outcome = ctl.pointer_up(Pos2::new(121.0, 15.0), &f.layout, &f.projector, &mut cb);
        assert_eq!(
            outcome,
            DragOutcome::Committed(DateCommit {
                task_id: f.a,
                start: d(7),
                end: d(7),
            })
        );
    }

    #[test]
    fn escape_discards_preview_without_callbacks_for_commit() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();
        ctl.pointer_down(Pos2::new(69.0, 15.0), &f.layout, &f.graph);
        assert!(matches!(ctl.state(), DragState::ResizingEnd(_)));
        ctl.pointer_move(Pos2::new(99.0, 15.0), &f.projector, &mut cb);
        assert_eq!(ctl.cancel(), DragOutcome::Cancelled);
        assert_eq!(*ctl.state(), DragState::Idle);
        assert!(cb
            .events
            .iter()
            .all(|e| matches!(e, InteractionEvent::Previewed { .. })));
    }

    #[test]
    fn click_without_movement_is_unchanged() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();
        ctl.pointer_down(Pos2::new(40.0, 15.0), &f.layout, &f.graph);
        let outcome = ctl.pointer_up(Pos2::new(43.0, 15.0), &f.layout, &f.projector, &mut cb);
        assert_eq!(outcome, DragOutcome::Unchanged);
        assert!(cb.events.is_empty());
    }

    #[test]
    fn new_press_supersedes_active_drag() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();
        ctl.pointer_down(Pos2::new(40.0, 15.0), &f.layout, &f.graph);
        ctl.pointer_move(Pos2::new(80.0, 15.0), &f.projector, &mut cb);
        // B body: x 90..120 on row 1 (y 37..57).
        assert!(ctl.pointer_down(Pos2::new(105.0, 47.0), &f.layout, &f.graph));
        assert_eq!(ctl.preview_for(f.a), None);
        assert_eq!(ctl.preview_for(f.b), Some((d(10), d(12))));
        assert!(!cb
            .events
            .iter()
            .any(|e| matches!(e, InteractionEvent::Committed { .. })));

        // Releasing in place ends the new drag; A's move was dropped.
        let outcome = ctl.pointer_up(Pos2::new(105.0, 47.0), &f.layout, &f.projector, &mut cb);
        assert_eq!(outcome, DragOutcome::Unchanged);
        assert!(cb
            .events
            .iter()
            .all(|e| matches!(e, InteractionEvent::Previewed { task_id, .. } if *task_id == f.a)));
    }

    #[test]
    fn link_between_connectors_requests_a_type() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();
        // A end connector at (79, 15); B start connector at (81, 47).
        assert!(ctl.pointer_down(Pos2::new(79.0, 15.0), &f.layout, &f.graph));
        ctl.pointer_move(Pos2::new(60.0, 40.0), &f.projector, &mut cb);
        assert_eq!(
            ctl.link_line(),
            Some((Pos2::new(79.0, 15.0), Pos2::new(60.0, 40.0)))
        );
        let outcome = ctl.pointer_up(Pos2::new(81.0, 47.0), &f.layout, &f.projector, &mut cb);
        let DragOutcome::LinkRequested(request) = outcome else {
            panic!("expected link request, got {outcome:?}");
        };
        assert_eq!(request.suggested_kind(), DependencyKind::FinishToStart);
        assert_eq!(
            cb.events,
            vec![InteractionEvent::LinkRequested {
                predecessor: f.a,
                successor: f.b,
            }]
        );

        let created = request.confirm(DependencyKind::StartToStart, &f.graph, &mut cb);
        assert_eq!(
            created,
            Some(MutationRequest::CreateDependency {
                predecessor: f.a,
                successor: f.b,
                kind: DependencyKind::StartToStart,
            })
        );
    }

    #[test]
    fn link_dropped_off_connector_is_cancelled() {
        let f = fixture();
        let mut ctl = controller();
        let mut cb = RecordingCallbacks::default();
        ctl.pointer_down(Pos2::new(79.0, 15.0), &f.layout, &f.graph);
        let outcome = ctl.pointer_up(Pos2::new(105.0, 47.0), &f.layout, &f.projector, &mut cb);
        assert_eq!(outcome, DragOutcome::Cancelled);
        assert!(cb.events.is_empty());
    }

    #[test]
    fn cyclic_link_is_rejected_as_warning() {
        let mut f = fixture();
        f.graph
            .add_dependency(f.a, f.b, DependencyKind::FinishToStart)
            .unwrap();
        let mut cb = RecordingCallbacks::default();
        let request = LinkRequest {
            predecessor: f.b,
            successor: f.a,
            from_anchor: Anchor::End,
            to_anchor: Anchor::Start,
        };
        assert_eq!(request.confirm(DependencyKind::FinishToStart, &f.graph, &mut cb), None);
        assert_eq!(
            cb.events,
            vec![InteractionEvent::LinkRejected(LinkRejection::WouldCycle)]
        );
        assert_eq!(f.graph.dependencies().len(), 1);
    }
}
