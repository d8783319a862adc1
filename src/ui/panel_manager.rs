//! Panel orchestration and layout management.
//!
//! Lays out the right-hand sidebar and the full-bleed animation area, and
//! collects sidebar interactions for the application coordinator.

use std::time::Instant;

use eframe::egui;
use hushfall::{AudioConfigPatch, AudioSource, Bounds};

use crate::app::AppContext;
use crate::rendering::painter_canvas::PainterCanvas;
use crate::ui::sidebar::{self, SidebarInteraction};

/// Result of panel interactions that need to be handled by the application coordinator.
pub enum PanelInteraction {
    Sidebar(SidebarInteraction),
    AudioEdited(AudioConfigPatch),
}

/// Manages the layout and rendering of all UI panels.
pub struct PanelManager;

impl PanelManager {
    /// Renders all panels in the application window.
    pub fn render_all_panels(ctx: &egui::Context, app: &mut AppContext) -> Vec<PanelInteraction> {
        let mut interactions = Vec::new();
        let state = app.store.get_state();

        // Sidebar hidden in fullscreen
        if !state.runtime_flags.is_fullscreen {
            egui::SidePanel::right("sidebar")
                .resizable(false)
                .default_width(260.0)
                .show(ctx, |ui| {
                    let themes: Vec<(String, String)> = app
                        .themes
                        .theme_ids()
                        .into_iter()
                        .map(|id| {
                            let name = app.themes.theme_name(&id).unwrap_or_else(|| id.clone());
                            (id, name)
                        })
                        .collect();

                    for interaction in sidebar::render_sidebar(ui, &state, &themes) {
                        interactions.push(PanelInteraction::Sidebar(interaction));
                    }

                    ui.separator();

                    let (history, smoothed) = {
                        let source = app.audio.source();
                        (source.volume_history(), source.smoothed_volume())
                    };
                    if let Some(patch) = app.audio_panel.render(ui, &history, smoothed) {
                        interactions.push(PanelInteraction::AudioEdited(patch));
                    }
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click());
                let rect = response.rect;
                app.themes.resize(Bounds::new(rect.width(), rect.height()));

                let mut canvas = PainterCanvas::new(&painter, rect);
                if !app.animation.tick(Instant::now(), &app.themes, &mut canvas) {
                    painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(10, 14, 30));
                    painter.text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "Paused · press Space",
                        egui::FontId::proportional(18.0),
                        egui::Color32::from_gray(160),
                    );
                }

                if response.double_clicked() {
                    interactions.push(PanelInteraction::Sidebar(SidebarInteraction::ToggleFullscreen));
                }
            });

        interactions
    }
}
