use chrono::NaiveDate;
use egui::{Color32, Pos2, Rect, Vec2};
use uuid::Uuid;

use crate::analysis::{BaselineDiff, CriticalPathReport};
use crate::config::ChartSettings;
use crate::model::{Milestone, ScheduleGraph, Task, TaskId, TimelineProjector};

/// Height of the baseline ghost strip drawn under a bar.
const GHOST_HEIGHT: f32 = 3.0;

/// Where one task is drawn, in chart-local pixels (x = 0 at the domain
/// start, y = 0 at the top of the first row).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGeometry {
    pub task_id: TaskId,
    pub row: usize,
    /// Full span of the task; the target for hit testing.
    pub rect: Rect,
    /// Drawn pieces: the segments, or the full span when unsegmented.
    pub bars: Vec<Rect>,
    pub critical: bool,
    /// Frozen dates from the selected baseline.
    pub ghost: Option<Rect>,
    pub progress: u8,
    pub color: Option<Color32>,
}

impl TaskGeometry {
    pub fn row_center_y(&self) -> f32 {
        self.rect.center().y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneGeometry {
    pub milestone_id: Uuid,
    pub center: Pos2,
    pub half_size: f32,
    pub color: Option<Color32>,
}

/// Render geometry for a whole chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartLayout {
    pub tasks: Vec<TaskGeometry>,
    pub milestones: Vec<MilestoneGeometry>,
    /// Row holding all milestones, when there are any.
    pub milestone_row: Option<usize>,
    pub width: f32,
    pub height: f32,
}

impl ChartLayout {
    /// Lay out `tasks` (already filtered and ordered) one per row. Milestones
    /// share a dedicated first row.
    pub fn build(
        graph: &ScheduleGraph,
        tasks: &[&Task],
        projector: &TimelineProjector,
        report: &CriticalPathReport,
        baseline: &BaselineDiff,
        settings: &ChartSettings,
    ) -> Self {
        let pitch = settings.row_pitch();
        let milestone_row = (!graph.milestones().is_empty()).then_some(0);
        let first_task_row = usize::from(milestone_row.is_some());

        let milestones = graph
            .milestones()
            .iter()
            .map(|m| milestone_geometry(m, projector, settings))
            .collect();

        let tasks: Vec<TaskGeometry> = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let row = first_task_row + i;
                let top = row as f32 * pitch;
                let rect = bar_rect(projector, settings, top, task.start_date, task.end_date);
                let segments = graph.segments(task.id);
                let bars = if segments.is_empty() {
                    vec![rect]
                } else {
                    segments
                        .iter()
                        .map(|s| bar_rect(projector, settings, top, s.start_date, s.end_date))
                        .collect()
                };
                let ghost = baseline.lookup(task.id).map(|(start, end)| {
                    let frozen = bar_rect(projector, settings, top, start, end);
                    Rect::from_min_size(
                        Pos2::new(frozen.left(), rect.bottom() + 1.0),
                        Vec2::new(frozen.width(), GHOST_HEIGHT),
                    )
                });
                TaskGeometry {
                    task_id: task.id,
                    row,
                    rect,
                    bars,
                    critical: report.is_critical(task.id),
                    ghost,
                    progress: task.progress,
                    color: task.color,
                }
            })
            .collect();

        let rows = first_task_row + tasks.len();
        Self {
            tasks,
            milestones,
            milestone_row,
            width: projector.total_width(),
            height: rows as f32 * pitch,
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskGeometry> {
        self.tasks.iter().find(|g| g.task_id == id)
    }

    /// Redraw one task at preview dates without touching the schedule.
    ///
    /// A pure shift translates the segments; a resize collapses them into
    /// one bar until the change is committed.
    pub fn apply_preview(
        &mut self,
        id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
        projector: &TimelineProjector,
    ) {
        let Some(geometry) = self.tasks.iter_mut().find(|g| g.task_id == id) else {
            return;
        };
        let (x, width) = projector.span(start, end);
        let rect = Rect::from_min_size(
            Pos2::new(x, geometry.rect.top()),
            Vec2::new(width, geometry.rect.height()),
        );
        let shift = Vec2::new(rect.left() - geometry.rect.left(), 0.0);
        if (rect.width() - geometry.rect.width()).abs() < f32::EPSILON {
            for bar in &mut geometry.bars {
                *bar = bar.translate(shift);
            }
        } else {
            geometry.bars = vec![rect];
        }
        geometry.rect = rect;
    }
}

fn bar_rect(
    projector: &TimelineProjector,
    settings: &ChartSettings,
    row_top: f32,
    start: NaiveDate,
    end: NaiveDate,
) -> Rect {
    let (x, width) = projector.span(start, end);
    Rect::from_min_size(
        Pos2::new(x, row_top + settings.bar_inset),
        Vec2::new(width, settings.row_height - settings.bar_inset * 2.0),
    )
}

fn milestone_geometry(
    milestone: &Milestone,
    projector: &TimelineProjector,
    settings: &ChartSettings,
) -> MilestoneGeometry {
    // Centred on the middle of the milestone's day.
    let x = projector.date_to_x(milestone.date) + projector.pixels_per_day / 2.0;
    MilestoneGeometry {
        milestone_id: milestone.id,
        center: Pos2::new(x, settings.row_height / 2.0),
        half_size: (settings.row_height / 2.0 - 4.0).max(4.0),
        color: milestone.color,
    }
}
