use chrono::NaiveDate;
use egui::{Color32, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};

use gantt_scheduler::analysis::{BaselineDiff, CriticalPathReport, OverloadWindow};
use gantt_scheduler::interaction::{
    Anchor, BarRegion, DragController, DragOutcome, DragState, HitZones, RecordingCallbacks,
};
use gantt_scheduler::model::{HeaderCell, ScheduleGraph, Task, TaskId, TimelineProjector};
use gantt_scheduler::render::{connector_paths, ChartLayout, ConnectorPath, TaskGeometry};
use gantt_scheduler::ChartSettings;

use crate::ui::theme;

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;

/// Everything the chart reads. Nothing in here is mutated while drawing.
pub struct ChartView<'a> {
    pub graph: &'a ScheduleGraph,
    /// Filtered and ordered rows.
    pub tasks: Vec<&'a Task>,
    pub report: &'a CriticalPathReport,
    pub baseline: &'a BaselineDiff,
    pub overloads: &'a [OverloadWindow],
    pub settings: &'a ChartSettings,
    pub today: NaiveDate,
    pub selected: Option<TaskId>,
}

/// What happened in the chart this frame.
#[derive(Debug, Clone, Default)]
pub struct ChartInteraction {
    pub outcome: Option<DragOutcome>,
    /// `Some(None)` clears the selection.
    pub select: Option<Option<TaskId>>,
}

/// Render the Gantt chart and drive the drag controller from raw pointer
/// input.
pub fn show_gantt_chart(
    view: &ChartView<'_>,
    drag: &mut DragController,
    callbacks: &mut RecordingCallbacks,
    ui: &mut Ui,
) -> ChartInteraction {
    let mut interaction = ChartInteraction::default();
    let settings = view.settings;
    let projector = settings.projector(view.graph, view.tasks.iter().copied(), view.today);
    let mut layout = ChartLayout::build(
        view.graph,
        &view.tasks,
        &projector,
        view.report,
        view.baseline,
        settings,
    );
    let zones = HitZones::from(settings);
    drag.set_zones(zones);

    let available = ui.available_size();
    let chart_width = layout.width.max(available.x);
    let chart_height = HEADER_HEIGHT + layout.height + 40.0;

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .drag_to_scroll(false)
        .show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(chart_width, chart_height.max(available.y)),
                Sense::click_and_drag(),
            );
            let origin = response.rect.min;
            let body = origin + Vec2::new(0.0, HEADER_HEIGHT);
            let to_local = |p: Pos2| p - body.to_vec2();

            // ── Pointer input ────────────────────────────────────────
            let (pressed, released, pointer) = ui.input(|i| {
                (
                    i.pointer.primary_pressed(),
                    i.pointer.primary_released(),
                    i.pointer.latest_pos(),
                )
            });

            if pressed {
                if let Some(pos) = response.hover_pos() {
                    let local = to_local(pos);
                    let hit = zones.hit_test(&layout, local);
                    interaction.select = Some(hit.map(|h| h.task_id));
                    drag.pointer_down(local, &layout, view.graph);
                }
            }
            // The controller listens globally only while it is active.
            if drag.is_active() {
                if let Some(pos) = pointer {
                    let local = to_local(pos);
                    if released {
                        interaction.outcome =
                            Some(drag.pointer_up(local, &layout, &projector, callbacks));
                    } else {
                        drag.pointer_move(local, &projector, callbacks);
                    }
                }
            }

            if let DragState::MovingTask(d) | DragState::ResizingStart(d) | DragState::ResizingEnd(d) =
                drag.state()
            {
                layout.apply_preview(d.task_id, d.preview_start, d.preview_end, &projector);
            }

            // ── Drawing ──────────────────────────────────────────────
            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

            let pitch = settings.row_pitch();
            let rows = (layout.height / pitch).round() as usize;
            for row in 0..rows {
                let y = body.y + row as f32 * pitch;
                if row % 2 == 0 {
                    painter.rect_filled(
                        Rect::from_min_size(Pos2::new(origin.x, y), Vec2::new(chart_width, pitch)),
                        0.0,
                        theme::BG_PANEL,
                    );
                }
                painter.line_segment(
                    [
                        Pos2::new(origin.x, y + pitch),
                        Pos2::new(origin.x + chart_width, y + pitch),
                    ],
                    Stroke::new(0.5, theme::BORDER_SUBTLE),
                );
            }

            let cells = projector.header_cells();
            draw_timeline_header(&painter, origin, &cells, chart_width, chart_height);
            draw_overloads(&painter, origin, &projector, view.overloads);

            if let Some(x) = projector.today_x() {
                draw_today_line(&painter, origin, x + projector.pixels_per_day / 2.0, chart_height);
            }

            for marker in &layout.milestones {
                let name = view
                    .graph
                    .milestone(marker.milestone_id)
                    .map(|m| m.name.as_str())
                    .unwrap_or_default();
                draw_milestone(&painter, body, marker.center, marker.half_size, marker.color, name);
            }

            let paths = connector_paths(view.graph.dependencies(), &layout, theme::CONNECTOR_STUB);
            for path in &paths {
                draw_connector(&painter, body, path);
            }

            let hovered = if drag.is_active() {
                None
            } else {
                response
                    .hover_pos()
                    .and_then(|p| zones.hit_test(&layout, to_local(p)))
            };

            for geometry in &layout.tasks {
                let Some(task) = view.graph.task(geometry.task_id) else {
                    continue;
                };
                let is_selected = view.selected == Some(task.id);
                let is_hovered = hovered.is_some_and(|h| h.task_id == task.id);
                draw_task_bar(&painter, body, geometry, task, is_selected);
                if is_selected || is_hovered {
                    draw_affordances(&painter, body, geometry, &zones);
                }
            }

            if let Some((from, to)) = drag.link_line() {
                painter.line_segment(
                    [from + body.to_vec2(), to + body.to_vec2()],
                    Stroke::new(2.0, theme::LINK_LINE),
                );
                painter.circle_filled(from + body.to_vec2(), 3.5, theme::LINK_LINE);
            }

            if let Some(hit) = hovered {
                if let Some(task) = view.graph.task(hit.task_id) {
                    egui::show_tooltip_at_pointer(
                        ui.ctx(),
                        ui.layer_id(),
                        egui::Id::new(("task-tip", task.id)),
                        |ui| task_tooltip(ui, task, view),
                    );
                }
            }

            set_cursor(ui, drag, hovered.map(|h| h.region));
        });

    interaction
}

fn set_cursor(ui: &Ui, drag: &DragController, hovered: Option<BarRegion>) {
    let icon = match (drag.state(), hovered) {
        (DragState::MovingTask(_), _) => egui::CursorIcon::Grabbing,
        (DragState::ResizingStart(_) | DragState::ResizingEnd(_), _) => {
            egui::CursorIcon::ResizeHorizontal
        }
        (DragState::LinkingDependency(_), _) => egui::CursorIcon::Crosshair,
        (DragState::Idle, Some(BarRegion::Body)) => egui::CursorIcon::Grab,
        (DragState::Idle, Some(BarRegion::StartHandle | BarRegion::EndHandle)) => {
            egui::CursorIcon::ResizeHorizontal
        }
        (DragState::Idle, Some(BarRegion::Connector(_))) => egui::CursorIcon::PointingHand,
        (DragState::Idle, None) => return,
    };
    ui.ctx().set_cursor_icon(icon);
}

fn task_tooltip(ui: &mut Ui, task: &Task, view: &ChartView<'_>) {
    ui.strong(&task.name);
    ui.label(format!(
        "{} → {} ({} d)",
        task.start_date.format("%d/%m/%Y"),
        task.end_date.format("%d/%m/%Y"),
        task.duration_days(),
    ));
    ui.label(format!("Progress: {}%", task.progress));
    if let Some(owner) = &task.owner {
        ui.label(format!("Owner: {owner}"));
    }
    if let Some(float) = view.report.float_days(task.id) {
        if float == 0 {
            ui.colored_label(theme::CRITICAL, "Critical");
        } else {
            ui.label(format!("Float: {float} d"));
        }
    }
    if let Some(v) = view.baseline.variance(task) {
        ui.label(format!(
            "Baseline: start {:+} d, finish {:+} d",
            v.start_days, v.finish_days
        ));
    }
}

fn draw_timeline_header(
    painter: &egui::Painter,
    origin: Pos2,
    cells: &[HeaderCell],
    width: f32,
    height: f32,
) {
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    for cell in cells {
        let x = origin.x + cell.x;
        if cell.is_weekend {
            painter.rect_filled(
                Rect::from_min_size(
                    Pos2::new(x, origin.y + HEADER_HEIGHT),
                    Vec2::new(cell.width, height - HEADER_HEIGHT),
                ),
                0.0,
                theme::BG_WEEKEND,
            );
        }
        painter.line_segment(
            [Pos2::new(x, origin.y + HEADER_HEIGHT), Pos2::new(x, origin.y + height)],
            Stroke::new(0.5, theme::GRID_LINE),
        );

        // Narrow cells only get the first tier.
        if cell.width < 14.0 {
            continue;
        }
        let clipped = painter.with_clip_rect(Rect::from_min_size(
            Pos2::new(x, origin.y),
            Vec2::new(cell.width, HEADER_HEIGHT),
        ));
        let color = if cell.is_today {
            theme::TODAY_LINE
        } else if cell.is_weekend {
            theme::TEXT_DIM
        } else {
            theme::TEXT_PRIMARY
        };
        clipped.text(
            Pos2::new(x + 4.0, origin.y + 14.0),
            egui::Align2::LEFT_CENTER,
            &cell.label,
            theme::font_header(),
            color,
        );
        clipped.text(
            Pos2::new(x + 4.0, origin.y + 30.0),
            egui::Align2::LEFT_CENTER,
            &cell.sub_label,
            theme::font_sub(),
            theme::TEXT_SECONDARY,
        );
    }
}

fn draw_overloads(
    painter: &egui::Painter,
    origin: Pos2,
    projector: &TimelineProjector,
    overloads: &[OverloadWindow],
) {
    for window in overloads {
        let (x, width) = projector.span(window.start, window.end);
        painter.rect_filled(
            Rect::from_min_size(
                Pos2::new(origin.x + x, origin.y + HEADER_HEIGHT - 4.0),
                Vec2::new(width, 4.0),
            ),
            0.0,
            theme::OVERLOAD,
        );
    }
}

fn draw_today_line(painter: &egui::Painter, origin: Pos2, x: f32, height: f32) {
    let x = origin.x + x;
    painter.line_segment(
        [
            Pos2::new(x, origin.y + HEADER_HEIGHT),
            Pos2::new(x, origin.y + height),
        ],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(x - badge_w / 2.0, origin.y + HEADER_HEIGHT - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

fn draw_task_bar(
    painter: &egui::Painter,
    body: Pos2,
    geometry: &TaskGeometry,
    task: &Task,
    is_selected: bool,
) {
    let offset = body.to_vec2();
    let bar_rect = geometry.rect.translate(offset);
    let rounding = Rounding::same(theme::BAR_ROUNDING);
    let color = geometry.color.unwrap_or_else(|| theme::task_color(geometry.row));

    if let Some(ghost) = geometry.ghost {
        painter.rect_filled(ghost.translate(offset), Rounding::same(1.5), theme::GHOST);
    }

    // Segmented tasks get a thin line across the gaps.
    if geometry.bars.len() > 1 {
        painter.line_segment(
            [bar_rect.left_center(), bar_rect.right_center()],
            Stroke::new(1.0, color.gamma_multiply(0.6)),
        );
    }

    for piece in &geometry.bars {
        let rect = piece.translate(offset);
        painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
        painter.rect_filled(rect, rounding, color);
        let highlight = Rect::from_min_size(
            rect.min,
            Vec2::new(rect.width(), (rect.height() * 0.45).max(4.0)),
        );
        painter.rect_filled(
            highlight,
            Rounding {
                nw: theme::BAR_ROUNDING,
                ne: theme::BAR_ROUNDING,
                sw: 0.0,
                se: 0.0,
            },
            Color32::from_white_alpha(25),
        );
    }

    if geometry.progress > 0 {
        let fraction = f32::from(geometry.progress.min(100)) / 100.0;
        let progress_rect = Rect::from_min_size(
            bar_rect.min,
            Vec2::new(bar_rect.width() * fraction, bar_rect.height()),
        );
        painter.rect_filled(progress_rect, rounding, theme::PROGRESS_OVERLAY);
    }

    if geometry.critical {
        painter.rect_stroke(bar_rect, rounding, Stroke::new(1.5, theme::CRITICAL));
    }
    if is_selected {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    if bar_rect.width() > 30.0 {
        let galley = painter.layout_no_wrap(task.name.clone(), theme::font_bar(), theme::TEXT_ON_BAR);
        let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
        painter
            .with_clip_rect(bar_rect)
            .galley(Pos2::new(bar_rect.left() + 6.0, text_y), galley, Color32::TRANSPARENT);
    } else {
        painter.text(
            Pos2::new(bar_rect.right() + 14.0, bar_rect.center().y),
            egui::Align2::LEFT_CENTER,
            &task.name,
            theme::font_bar(),
            theme::TEXT_SECONDARY,
        );
    }
}

/// Resize pills and link connectors.
fn draw_affordances(painter: &egui::Painter, body: Pos2, geometry: &TaskGeometry, zones: &HitZones) {
    let bar_rect = geometry.rect.translate(body.to_vec2());
    let handle_h = bar_rect.height() * 0.55;
    let handle_y = bar_rect.center().y - handle_h / 2.0;
    for x in [bar_rect.left() - 1.5, bar_rect.right() - 2.5] {
        painter.rect_filled(
            Rect::from_min_size(Pos2::new(x, handle_y), Vec2::new(4.0, handle_h)),
            Rounding::same(2.0),
            theme::HANDLE_COLOR,
        );
    }
    for anchor in [Anchor::Start, Anchor::End] {
        let center = zones.connector_center(bar_rect, anchor);
        painter.circle(
            center,
            zones.connector_radius - 1.0,
            theme::BG_DARK,
            Stroke::new(1.5, theme::ACCENT),
        );
    }
}

fn draw_connector(painter: &egui::Painter, body: Pos2, path: &ConnectorPath) {
    let offset = body.to_vec2();
    let color = if path.critical {
        theme::CRITICAL
    } else {
        theme::CONNECTOR
    };
    let points: Vec<Pos2> = path.points.iter().map(|p| *p + offset).collect();
    painter.add(Shape::line(points, Stroke::new(1.2, color)));
    if let Some(head) = path.arrow_head(theme::ARROW_SIZE) {
        painter.add(Shape::convex_polygon(
            head.iter().map(|p| *p + offset).collect(),
            color,
            Stroke::NONE,
        ));
    }
}

fn draw_milestone(
    painter: &egui::Painter,
    body: Pos2,
    center: Pos2,
    size: f32,
    color: Option<Color32>,
    name: &str,
) {
    let center = center + body.to_vec2();
    let diamond = |c: Pos2| {
        vec![
            Pos2::new(c.x, c.y - size),
            Pos2::new(c.x + size, c.y),
            Pos2::new(c.x, c.y + size),
            Pos2::new(c.x - size, c.y),
        ]
    };
    painter.add(Shape::convex_polygon(
        diamond(center + Vec2::new(1.0, 1.5)),
        Color32::from_black_alpha(40),
        Stroke::NONE,
    ));
    painter.add(Shape::convex_polygon(
        diamond(center),
        color.unwrap_or(theme::MILESTONE),
        Stroke::NONE,
    ));
    painter.text(
        Pos2::new(center.x + size + 6.0, center.y),
        egui::Align2::LEFT_CENTER,
        name,
        theme::font_bar(),
        theme::TEXT_SECONDARY,
    );
}
