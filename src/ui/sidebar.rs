//! Sidebar theme controls
//!
//! Theme selector, playback buttons and the per-theme parameter sliders.
//! Sliders edit a local copy of the theme config and report changes as
//! interactions; nothing here writes to the store directly.

use eframe::egui;
use hushfall::{color32_to_hex, hex_to_color32, AppState, ThemeConfig};
use serde_json::Value;

/// Result of user interaction with the sidebar
#[derive(Debug, Clone, PartialEq)]
pub enum SidebarInteraction {
    ThemeSelected(String),
    ParamChanged { param: String, value: Value },
    ToggleRunning,
    ToggleFullscreen,
    DebugToggled(bool),
    DumpDebugReport,
}

/// Slider description: config key, label, range.
const PARAM_SLIDERS: [(&str, &str, f64, f64); 4] = [
    ("size", "Size", 0.2, 3.0),
    ("speed", "Speed", 0.1, 4.0),
    ("wobble", "Wobble", 0.0, 3.0),
    ("wind", "Wind", -2.0, 2.0),
];

fn param(config: &ThemeConfig, key: &str, default: f64) -> f64 {
    config.get(key).and_then(Value::as_f64).unwrap_or(default)
}

/// Renders the theme section of the sidebar.
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `state` - Snapshot of the application state
/// * `themes` - Registered (id, display name) pairs
pub fn render_sidebar(ui: &mut egui::Ui, state: &AppState, themes: &[(String, String)]) -> Vec<SidebarInteraction> {
    let mut interactions = Vec::new();

    ui.heading(&state.app_name);
    ui.separator();

    let current_name = themes
        .iter()
        .find(|(id, _)| *id == state.current_theme)
        .map(|(_, name)| name.as_str())
        .unwrap_or(state.current_theme.as_str());

    egui::ComboBox::from_label("Theme")
        .selected_text(current_name)
        .show_ui(ui, |ui| {
            for (id, name) in themes {
                if ui.selectable_label(*id == state.current_theme, name).clicked() && *id != state.current_theme {
                    interactions.push(SidebarInteraction::ThemeSelected(id.clone()));
                }
            }
        });

    ui.horizontal(|ui| {
        let label = if state.is_running() { "⏸ Pause" } else { "▶ Play" };
        if ui.button(label).clicked() {
            interactions.push(SidebarInteraction::ToggleRunning);
        }
        let label = if state.runtime_flags.is_fullscreen { "🗗 Window" } else { "⛶ Fullscreen" };
        if ui.button(label).clicked() {
            interactions.push(SidebarInteraction::ToggleFullscreen);
        }
    });

    ui.separator();

    if let Some(config) = state.current_theme_config() {
        let mut count = param(config, "count", 150.0).round() as u64;
        if ui.add(egui::Slider::new(&mut count, 0..=1000).text("Count")).changed() {
            interactions.push(SidebarInteraction::ParamChanged {
                param: "count".to_string(),
                value: Value::from(count),
            });
        }

        for (key, label, min, max) in PARAM_SLIDERS {
            let mut value = param(config, key, 1.0);
            if ui.add(egui::Slider::new(&mut value, min..=max).text(label)).changed() {
                interactions.push(SidebarInteraction::ParamChanged {
                    param: key.to_string(),
                    value: Value::from(value),
                });
            }
        }

        let hex = config.get("color").and_then(Value::as_str).unwrap_or("#ffffff");
        let mut color = hex_to_color32(hex);
        ui.horizontal(|ui| {
            ui.label("Color");
            if ui.color_edit_button_srgba(&mut color).changed() {
                interactions.push(SidebarInteraction::ParamChanged {
                    param: "color".to_string(),
                    value: Value::from(color32_to_hex(color)),
                });
            }
        });
    } else {
        ui.label("No settings for this theme");
    }

    ui.separator();

    ui.collapsing("Debug", |ui| {
        let mut debug = state.debug;
        if ui.checkbox(&mut debug, "Record state history").changed() {
            interactions.push(SidebarInteraction::DebugToggled(debug));
        }
        if ui.add_enabled(state.debug, egui::Button::new("Log debug report")).clicked() {
            interactions.push(SidebarInteraction::DumpDebugReport);
        }
        ui.label(format!("v{}", state.version));
    });

    interactions
}
