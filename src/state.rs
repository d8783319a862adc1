//! Application state schema.
//!
//! `AppState` is the single tree owned by the [`StateManager`](crate::StateManager).
//! Its serde representation (camelCase, runtime flags flattened to the top
//! level) is also the "JSON view" used for dot-path lookups, patches and diffs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::particles;

/// Arbitrary-shaped per-theme configuration (color, count, speed, ...).
pub type ThemeConfig = serde_json::Map<String, Value>;

/// Booleans describing the animation lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeFlags {
    pub is_running: bool,
    pub is_fullscreen: bool,
    pub is_transitioning: bool,
}

/// Audio settings mirrored into the external audio source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub enabled: bool,
    /// Smoothed volume (0..=1) above which an audio pulse fires.
    pub volume_threshold: f64,
    /// Gain applied to the raw volume before comparing against the threshold.
    pub sensitivity: f64,
    pub show_visualizer: bool,
    /// Minimum milliseconds between two pulses.
    pub trigger_cooldown: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volume_threshold: 0.3,
            sensitivity: 1.0,
            show_visualizer: true,
            trigger_cooldown: 500,
        }
    }
}

/// The whole application state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub debug: bool,
    #[serde(flatten)]
    pub runtime_flags: RuntimeFlags,
    pub current_theme: String,
    pub theme_configs: BTreeMap<String, ThemeConfig>,
    pub audio_config: AudioConfig,
}

impl Default for AppState {
    fn default() -> Self {
        let theme_configs = particles::BUILTIN_THEMES
            .iter()
            .map(|id| (id.to_string(), particles::default_config(id)))
            .collect();

        Self {
            app_name: "Hushfall".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            debug: false,
            runtime_flags: RuntimeFlags::default(),
            current_theme: particles::SNOW.to_string(),
            theme_configs,
            audio_config: AudioConfig::default(),
        }
    }
}

impl AppState {
    pub fn is_running(&self) -> bool {
        self.runtime_flags.is_running
    }

    /// Config of the active theme, if it is registered.
    pub fn current_theme_config(&self) -> Option<&ThemeConfig> {
        self.theme_configs.get(&self.current_theme)
    }

    /// JSON view of the state.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Resolves a dot-delimited path (`"themeConfigs.snow.speed"`) against the
    /// JSON view. An empty path resolves to the whole tree.
    pub fn section(&self, path: &str) -> Option<Value> {
        let root = self.to_value();
        if path.is_empty() {
            return Some(root);
        }

        let mut node = &root;
        for segment in path.split('.') {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_current_theme_is_registered() {
        let state = AppState::default();
        assert!(state.theme_configs.contains_key(&state.current_theme));
        assert!(state.current_theme_config().is_some());
    }

    #[test]
    fn test_runtime_flags_are_flattened() {
        let value = AppState::default().to_value();
        assert_eq!(value["isRunning"], Value::Bool(false));
        assert!(value.get("runtimeFlags").is_none());
        assert_eq!(value["audioConfig"]["triggerCooldown"], 500);
    }

    #[test]
    fn test_section_lookup() {
        let state = AppState::default();
        assert_eq!(state.section("audioConfig.enabled"), Some(Value::Bool(false)));
        assert_eq!(state.section("currentTheme"), Some(Value::from("snow")));
        assert!(state.section("themeConfigs.snow").unwrap().is_object());
        assert_eq!(state.section("themeConfigs.missing.speed"), None);
        assert_eq!(state.section("isRunning.deeper"), None);
    }
}
