use chrono::NaiveDate;
use uuid::Uuid;

use gantt_scheduler::analysis::{
    detect_overload, BaselineDiff, CriticalPathAnalyzer, CriticalPathReport, OverloadWindow,
};
use gantt_scheduler::interaction::{
    DragController, DragOutcome, HitZones, InteractionEvent, LinkRequest, RecordingCallbacks,
};
use gantt_scheduler::model::{DependencyKind, Task, TaskId, TaskStatus, ViewGranularity};
use gantt_scheduler::{ChartSettings, InMemoryBackend, MutationRequest, ScheduleBackend};

use crate::ui;

/// Derived views, recomputed only when the graph revision or the filter
/// changes.
struct Analysis {
    revision: u64,
    hide_completed: bool,
    report: CriticalPathReport,
    overloads: Vec<OverloadWindow>,
}

/// A released link gesture waiting for the user to pick a type.
struct PendingLink {
    request: LinkRequest,
    kind: DependencyKind,
}

/// Main application state.
pub struct GanttApp {
    pub backend: InMemoryBackend,
    pub settings: ChartSettings,
    pub selected_task: Option<TaskId>,
    pub hide_completed: bool,
    pub baseline_name: String,
    pub status_message: String,

    drag: DragController,
    events: RecordingCallbacks,
    pending_link: Option<PendingLink>,
    analysis: Option<Analysis>,
}

impl GanttApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        ui::theme::apply_theme(&cc.egui_ctx);
        let settings = ChartSettings::load();
        let drag = DragController::new(HitZones::from(&settings));
        Self {
            backend: InMemoryBackend::sample(today()),
            settings,
            selected_task: None,
            hide_completed: false,
            baseline_name: String::new(),
            status_message: "Ready".to_string(),
            drag,
            events: RecordingCallbacks::default(),
            pending_link: None,
            analysis: None,
        }
    }

    pub fn set_granularity(&mut self, granularity: ViewGranularity) {
        self.settings.granularity = granularity;
        if let Err(e) = self.settings.save() {
            tracing::warn!(error = %e, "failed to save chart settings");
        }
    }

    pub fn capture_baseline(&mut self) {
        let name = match self.baseline_name.trim() {
            "" => format!("Baseline {}", self.backend.baselines().len() + 1),
            name => name.to_string(),
        };
        match self.backend.capture_baseline(&name, None) {
            Ok(baseline) => {
                self.status_message = format!("Captured '{}'", baseline.name());
                self.baseline_name.clear();
            }
            Err(e) => self.status_message = format!("Capture failed: {e}"),
        }
    }

    pub fn select_baseline(&mut self, id: Option<Uuid>) {
        if let Err(e) = self.backend.baselines_mut().select(id) {
            self.status_message = e.to_string();
        }
    }

    pub fn delete_baseline(&mut self, id: Uuid) {
        match self.backend.delete_baseline(id) {
            Ok(()) => self.status_message = "Baseline deleted".to_string(),
            Err(e) => self.status_message = e.to_string(),
        }
    }

    fn refresh_analysis(&mut self) {
        let graph = self.backend.graph();
        let hide_completed = self.hide_completed;
        if self
            .analysis
            .as_ref()
            .is_some_and(|a| a.revision == graph.revision() && a.hide_completed == hide_completed)
        {
            return;
        }
        tracing::debug!(revision = graph.revision(), "recomputing schedule analysis");
        let visible = graph.visible_tasks(|t| is_shown(t, hide_completed));
        self.analysis = Some(Analysis {
            revision: graph.revision(),
            hide_completed,
            report: CriticalPathAnalyzer::analyze(visible.iter().copied(), graph.dependencies()),
            overloads: detect_overload(visible, self.settings.overload_threshold),
        });
    }

    /// Forward a request to the backend. Failures end up in the status bar.
    fn submit(&mut self, request: MutationRequest) -> bool {
        match request.apply(&mut self.backend) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "mutation failed");
                self.status_message = e.to_string();
                false
            }
        }
    }

    fn handle_outcome(&mut self, outcome: DragOutcome) {
        match outcome {
            DragOutcome::Committed(commit) => {
                let name = self.task_name(commit.task_id);
                if !self.submit(commit.into_request()) {
                    return;
                }
                self.status_message = format!(
                    "Updated '{}' ({} → {})",
                    name,
                    commit.start.format("%Y-%m-%d"),
                    commit.end.format("%Y-%m-%d")
                );
            }
            DragOutcome::LinkRequested(request) => {
                self.pending_link = Some(PendingLink {
                    kind: request.suggested_kind(),
                    request,
                });
            }
            DragOutcome::Unchanged => {}
            DragOutcome::Cancelled => self.status_message = "Cancelled".to_string(),
        }
    }

    fn drain_events(&mut self) {
        let events: Vec<InteractionEvent> = self.events.drain().collect();
        for event in events {
            match event {
                InteractionEvent::Previewed { task_id, start, end } => {
                    self.status_message = format!(
                        "'{}': {} → {}",
                        self.task_name(task_id),
                        start.format("%Y-%m-%d"),
                        end.format("%Y-%m-%d")
                    );
                }
                InteractionEvent::LinkRequested {
                    predecessor,
                    successor,
                } => {
                    self.status_message = format!(
                        "Link '{}' → '{}': choose a type",
                        self.task_name(predecessor),
                        self.task_name(successor)
                    );
                }
                InteractionEvent::LinkRejected(reason) => {
                    self.status_message = format!("Link refused: {reason}");
                }
                InteractionEvent::Committed { .. } => {}
            }
        }
    }

    fn task_name(&self, id: TaskId) -> String {
        self.backend
            .graph()
            .task(id)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    fn show_link_picker(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.pending_link.as_mut() else {
            return;
        };
        let mut create = false;
        let mut dismiss = false;
        egui::Window::new("New dependency")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                for kind in DependencyKind::ALL {
                    ui.radio_value(&mut pending.kind, kind, kind.label());
                }
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    create = ui.button("Create").clicked();
                    dismiss = ui.button("Cancel").clicked();
                });
            });

        if create {
            if let Some(pending) = self.pending_link.take() {
                let request =
                    pending
                        .request
                        .confirm(pending.kind, self.backend.graph(), &mut self.events);
                if let Some(request) = request {
                    if self.submit(request) {
                        self.status_message =
                            format!("Linked ({})", pending.kind.short_label());
                    }
                }
            }
        } else if dismiss {
            self.pending_link = None;
            self.status_message = "Cancelled".to_string();
        }
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.drag.is_active() {
                let outcome = self.drag.cancel();
                self.handle_outcome(outcome);
            } else if self.pending_link.take().is_some() {
                self.status_message = "Cancelled".to_string();
            }
        }

        self.refresh_analysis();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_STATUS)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .size(11.0)
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    let Some(analysis) = self.analysis.as_ref() else {
                        return;
                    };
                    let stats = &analysis.report.stats;
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let summary = format!(
                            "Tasks: {} · Done: {} · Avg: {:.0}% · {} d · Critical: {} · Overloads: {}",
                            stats.total,
                            stats.completed,
                            stats.average_progress,
                            stats.duration_days,
                            analysis.report.critical.len(),
                            analysis.overloads.len(),
                        );
                        ui.label(
                            egui::RichText::new(summary)
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        let mut interaction = ui::gantt_chart::ChartInteraction::default();
        if let Some(analysis) = self.analysis.as_ref() {
            let graph = self.backend.graph();
            let baseline = BaselineDiff::new(self.backend.baselines().selected());
            let hide_completed = self.hide_completed;
            let view = ui::gantt_chart::ChartView {
                graph,
                tasks: graph.visible_tasks(|t| is_shown(t, hide_completed)),
                report: &analysis.report,
                baseline: &baseline,
                overloads: &analysis.overloads,
                settings: &self.settings,
                today: today(),
                selected: self.selected_task,
            };
            let chart_frame = egui::Frame::default()
                .fill(ui::theme::BG_DARK)
                .inner_margin(egui::Margin::ZERO);
            egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
                interaction = ui::gantt_chart::show_gantt_chart(
                    &view,
                    &mut self.drag,
                    &mut self.events,
                    ui,
                );
            });
        }

        if let Some(selection) = interaction.select {
            self.selected_task = selection;
        }
        self.drain_events();
        if let Some(outcome) = interaction.outcome {
            self.handle_outcome(outcome);
        }
        self.show_link_picker(ctx);
        self.drain_events();
    }
}

fn is_shown(task: &Task, hide_completed: bool) -> bool {
    !(hide_completed && task.status == TaskStatus::Completed)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
