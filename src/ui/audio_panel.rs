//! Sidebar audio panel.
//!
//! The panel observes the `audio` category and keeps its own copy of the audio
//! settings, so rendering does not need to copy the whole state tree.

use std::cell::RefCell;

use eframe::egui;
use egui::Color32;
use hushfall::{AppState, AudioConfig, AudioConfigPatch, StateObserver};

use crate::rendering::visualizer;

/// Audio settings edited in the sidebar.
pub struct SidebarAudioPanel {
    config: RefCell<AudioConfig>,
}

impl SidebarAudioPanel {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config: RefCell::new(config),
        }
    }

    pub fn config(&self) -> AudioConfig {
        self.config.borrow().clone()
    }

    /// Renders the panel. Returns the edited fields, if any.
    pub fn render(&self, ui: &mut egui::Ui, volume_history: &[f64], smoothed_volume: f64) -> Option<AudioConfigPatch> {
        let mut edited = self.config();
        let mut patch = AudioConfigPatch::default();

        ui.heading("Audio");

        if ui.checkbox(&mut edited.enabled, "React to sound").changed() {
            patch.enabled = Some(edited.enabled);
        }

        ui.add_enabled_ui(edited.enabled, |ui| {
            if ui
                .add(egui::Slider::new(&mut edited.volume_threshold, 0.05..=1.0).text("Threshold"))
                .changed()
            {
                patch.volume_threshold = Some(edited.volume_threshold);
            }
            if ui
                .add(egui::Slider::new(&mut edited.sensitivity, 0.1..=5.0).text("Sensitivity"))
                .changed()
            {
                patch.sensitivity = Some(edited.sensitivity);
            }
            if ui
                .add(egui::Slider::new(&mut edited.trigger_cooldown, 100..=5000).text("Cooldown (ms)"))
                .changed()
            {
                patch.trigger_cooldown = Some(edited.trigger_cooldown);
            }
            if ui.checkbox(&mut edited.show_visualizer, "Show visualizer").changed() {
                patch.show_visualizer = Some(edited.show_visualizer);
            }
        });

        if edited.enabled && edited.show_visualizer {
            ui.label(format!("Level: {:.0}%", (smoothed_volume * edited.sensitivity).min(1.0) * 100.0));
            visualizer::render_visualizer(ui, volume_history, edited.volume_threshold, Color32::from_rgb(52, 152, 219));
        }

        if patch.is_empty() {
            None
        } else {
            Some(patch)
        }
    }
}

impl StateObserver for SidebarAudioPanel {
    fn on_state_change(&self, new_state: &AppState, _old_state: &AppState) -> anyhow::Result<()> {
        *self.config.borrow_mut() = new_state.audio_config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushfall::{Category, StateManager, StatePatch};
    use std::rc::Rc;

    #[test]
    fn test_panel_follows_audio_state() {
        let store = StateManager::new();
        let panel = Rc::new(SidebarAudioPanel::new(store.get_state().audio_config));
        store.subscribe(panel.clone(), Category::Audio);

        store.update_state(&StatePatch::new().with_running(true), "test");
        assert_eq!(panel.config(), store.get_state().audio_config);

        let patch = StatePatch::new().with_audio(AudioConfigPatch {
            volume_threshold: Some(0.8),
            ..Default::default()
        });
        store.update_state(&patch, "test");
        assert_eq!(panel.config().volume_threshold, 0.8);
    }
}
