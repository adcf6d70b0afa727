use crate::assets::LoadProgress;
use crate::config::{Rgb, SettingsStore};
use crate::scene::classify::{ClassificationReport, CollectionRegistry};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading {
        path: String,
        progress: LoadProgress,
    },
    Loaded {
        name: String,
        path: String,
    },
    Failed(String),
}

/// Read-only scene facts shown in the panel.
pub struct PanelView<'a> {
    pub registry: &'a CollectionRegistry,
    pub report: ClassificationReport,
    pub draw_failures: u64,
}

/// What the user asked for this frame, handled by the app after the egui pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UiActions {
    pub open_model: Option<PathBuf>,
    pub frame_model: bool,
    pub save_settings: bool,
}

pub struct UiState {
    show_panel: bool,
    status: LoadStatus,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            show_panel: true,
            status: LoadStatus::Idle,
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: LoadStatus) {
        self.status = status;
    }

    pub fn toggle_panel(&mut self) {
        self.show_panel = !self.show_panel;
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        settings: &mut SettingsStore,
        view: &PanelView<'_>,
    ) -> UiActions {
        let mut actions = UiActions::default();
        if !self.show_panel {
            return actions;
        }
        let status = &self.status;
        egui::Window::new("Sun Study")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                model_section(ui, status, &mut actions);
                ui.separator();
                sun_section(ui, settings);
                ui.separator();
                material_section(ui, settings, view);
                ui.separator();
                if ui.button("Save settings").clicked() {
                    actions.save_settings = true;
                }
                if view.draw_failures > 0 {
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::LIGHT_RED,
                        format!("Draw failures: {}", view.draw_failures),
                    );
                }
            });
        actions
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

fn model_section(ui: &mut egui::Ui, status: &LoadStatus, actions: &mut UiActions) {
    ui.heading("Model");
    match status {
        LoadStatus::Idle => {
            ui.label("No model loaded");
        }
        LoadStatus::Loading { path, progress } => {
            ui.label(format!("Loading {}", path));
            match progress.fraction() {
                Some(fraction) => {
                    ui.add(egui::ProgressBar::new(fraction).show_percentage());
                }
                None => {
                    ui.label(format!("{} KiB", progress.loaded / 1024));
                }
            }
        }
        LoadStatus::Loaded { name, path } => {
            ui.label(name.as_str()).on_hover_text(path.as_str());
        }
        LoadStatus::Failed(message) => {
            ui.colored_label(egui::Color32::LIGHT_RED, message.as_str());
        }
    }
    ui.horizontal(|ui| {
        if ui.button("Open model…").clicked() {
            actions.open_model = rfd::FileDialog::new()
                .add_filter("glTF", &["glb", "gltf"])
                .pick_file();
        }
        if ui
            .add_enabled(
                matches!(status, LoadStatus::Loaded { .. }),
                egui::Button::new("Frame model"),
            )
            .clicked()
        {
            actions.frame_model = true;
        }
    });
}

fn sun_section(ui: &mut egui::Ui, settings: &mut SettingsStore) {
    ui.heading("Sun");
    let current = settings.snapshot().clone();

    let mut hour = current.sun.hour_of_day;
    if ui
        .add(egui::Slider::new(&mut hour, 0..=23).text("Hour"))
        .changed()
    {
        settings.set_hour(hour);
    }
    let mut minute = current.sun.minute_of_hour;
    if ui
        .add(
            egui::Slider::new(&mut minute, 0..=59)
                .step_by(15.0)
                .text("Minute"),
        )
        .changed()
    {
        settings.set_minute(minute);
    }
    let mut radius = current.sun.orbit_radius;
    if ui
        .add(egui::Slider::new(&mut radius, 1.0..=50.0).text("Sun radius"))
        .changed()
    {
        settings.set_orbit_radius(radius);
    }

    ui.horizontal(|ui| {
        let mut animate = current.animate_time;
        if ui.checkbox(&mut animate, "Animate time").changed() {
            settings.set_animate_time(animate);
        }
        let mut speed = current.time_speed;
        if ui
            .add(
                egui::DragValue::new(&mut speed)
                    .range(0.0..=10_000.0)
                    .suffix("×"),
            )
            .changed()
        {
            settings.set_time_speed(speed);
        }
    });
}

fn material_section(ui: &mut egui::Ui, settings: &mut SettingsStore, view: &PanelView<'_>) {
    ui.heading("Materials");
    let palette = settings.snapshot().palette;

    ui.horizontal(|ui| {
        let mut color = palette.color2.0;
        ui.label("Context");
        if ui.color_edit_button_srgb(&mut color).changed() {
            settings.set_color2(Rgb(color));
        }
        ui.monospace(Rgb(color).to_string());
    });
    ui.horizontal(|ui| {
        let mut color = palette.color3.0;
        ui.label("Site");
        if ui.color_edit_button_srgb(&mut color).changed() {
            settings.set_color3(Rgb(color));
        }
        ui.monospace(Rgb(color).to_string());
    });

    let report = view.report;
    ui.label(format!(
        "{} meshes: {} base, {} context, {} site",
        report.total(),
        report.base,
        report.context,
        report.site
    ));
    egui::CollapsingHeader::new(format!("Collections ({})", view.registry.names().len()))
        .default_open(false)
        .show(ui, |ui| {
            if view.registry.is_empty() {
                ui.label("None");
            }
            for (index, name) in view.registry.names().iter().enumerate() {
                let tier = if index == 0 { "base" } else { "context" };
                ui.label(format!("{} ({})", name, tier));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn run_panel(ui_state: &mut UiState, settings: &mut SettingsStore) -> UiActions {
        let ctx = egui::Context::default();
        let registry = CollectionRegistry::from_names(["Tile", "Context"]);
        let view = PanelView {
            registry: &registry,
            report: ClassificationReport::default(),
            draw_failures: 0,
        };
        let mut actions = UiActions::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = ui_state.show(ctx, settings, &view);
        });
        actions
    }

    #[test]
    fn idle_panel_requests_nothing_and_leaves_settings_clean() {
        let mut settings = SettingsStore::new(ViewerConfig::default().initial_settings());
        settings.take_changes();
        let mut ui_state = UiState::new();

        let actions = run_panel(&mut ui_state, &mut settings);
        assert_eq!(actions, UiActions::default());
        assert!(!settings.take_changes().any());
    }

    #[test]
    fn hidden_panel_skips_drawing() {
        let mut settings = SettingsStore::new(ViewerConfig::default().initial_settings());
        let mut ui_state = UiState::new();
        ui_state.toggle_panel();
        ui_state.set_status(LoadStatus::Failed("boom".to_string()));
        assert_eq!(run_panel(&mut ui_state, &mut settings), UiActions::default());
        assert_eq!(ui_state.status(), &LoadStatus::Failed("boom".to_string()));
    }
}
