use crate::app::GanttApp;
use crate::ui::theme;
use egui::{menu, RichText, Ui};
use gantt_scheduler::model::ViewGranularity;

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut GanttApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            ui.label(RichText::new("Timeline Scale").small().weak());
            for granularity in ViewGranularity::ALL {
                let selected = app.settings.granularity == granularity;
                if ui.radio(selected, granularity.label()).clicked() {
                    app.set_granularity(granularity);
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.checkbox(&mut app.hide_completed, "Hide completed").changed() {
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Baselines  ").font(theme::font_menu()), |ui| {
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut app.baseline_name)
                        .hint_text("Baseline name")
                        .desired_width(140.0),
                );
                if ui.button("Capture").clicked() {
                    app.capture_baseline();
                    ui.close_menu();
                }
            });
            ui.separator();
            ui.label(RichText::new("Compare against").small().weak());
            let selected = app.backend.baselines().selected().map(|b| b.id());
            if ui.radio(selected.is_none(), "None").clicked() {
                app.select_baseline(None);
                ui.close_menu();
            }
            let listed: Vec<_> = app
                .backend
                .baselines()
                .list()
                .into_iter()
                .map(|b| (b.id(), b.name().to_string(), b.created_at()))
                .collect();
            for (id, name, created_at) in listed {
                ui.horizontal(|ui| {
                    let label = format!("{name}  ({})", created_at.format("%Y-%m-%d %H:%M"));
                    if ui.radio(selected == Some(id), label).clicked() {
                        app.select_baseline(Some(id));
                        ui.close_menu();
                    }
                    if ui.small_button("✕").on_hover_text("Delete baseline").clicked() {
                        app.delete_baseline(id);
                    }
                });
            }
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(app.backend.graph().name()).size(11.0).weak());
        });
    });
}
