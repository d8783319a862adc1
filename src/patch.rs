//! Structured state patches and the deep-merge engine.
//!
//! A [`StatePatch`] names only the fields it wants to change. Applying it
//! merges field by field: nested objects recurse, scalars and arrays are
//! leaves that are overwritten only when the incoming value differs.
//! Equality is structural everywhere (`PartialEq` on typed fields,
//! [`values_equal`] on theme configs), so an array of objects is compared
//! element by element rather than by identity, and `150` equals `150.0`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::category::{Category, CategorySet};
use crate::state::{AppState, ThemeConfig};

/// Partial update of [`AudioConfig`](crate::state::AudioConfig).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AudioConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_visualizer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_cooldown: Option<u64>,
}

impl AudioConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial update of [`AppState`].
///
/// Deserializes from the same camelCase JSON shape as the state itself, e.g.
/// `{"isRunning": true, "themeConfigs": {"snow": {"speed": 2.0}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fullscreen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_transitioning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_theme: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub theme_configs: BTreeMap<String, ThemeConfig>,
    #[serde(skip_serializing_if = "AudioConfigPatch::is_empty")]
    pub audio_config: AudioConfigPatch,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.is_running = Some(running);
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.is_fullscreen = Some(fullscreen);
        self
    }

    pub fn with_transitioning(mut self, transitioning: bool) -> Self {
        self.is_transitioning = Some(transitioning);
        self
    }

    pub fn with_current_theme(mut self, theme: impl Into<String>) -> Self {
        self.current_theme = Some(theme.into());
        self
    }

    /// Merges `config` into the patch entry for `theme`.
    pub fn with_theme_config(mut self, theme: impl Into<String>, config: ThemeConfig) -> Self {
        self.theme_configs.entry(theme.into()).or_default().extend(config);
        self
    }

    pub fn with_theme_param(
        mut self,
        theme: impl Into<String>,
        param: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.theme_configs
            .entry(theme.into())
            .or_default()
            .insert(param.into(), value.into());
        self
    }

    pub fn with_audio(mut self, audio: AudioConfigPatch) -> Self {
        self.audio_config = audio;
        self
    }

    /// Deep-merges the patch into `state`.
    ///
    /// Returns the categories implicated by the leaves that actually changed;
    /// an empty set means the state is untouched.
    pub fn apply(&self, state: &mut AppState) -> CategorySet {
        let mut touched = CategorySet::new();

        let metadata_changed = set_if_changed(&mut state.app_name, &self.app_name)
            | set_if_changed(&mut state.version, &self.version)
            | set_if_changed(&mut state.debug, &self.debug);
        if metadata_changed {
            touched.insert(Category::Global);
        }

        let flags = &mut state.runtime_flags;
        let flags_changed = set_if_changed(&mut flags.is_running, &self.is_running)
            | set_if_changed(&mut flags.is_fullscreen, &self.is_fullscreen)
            | set_if_changed(&mut flags.is_transitioning, &self.is_transitioning);
        if flags_changed {
            touched.insert(Category::AppState);
        }

        for (theme_id, config_patch) in &self.theme_configs {
            let changed = match state.theme_configs.get_mut(theme_id) {
                Some(config) => merge_object(config, config_patch),
                None => {
                    state.theme_configs.insert(theme_id.clone(), config_patch.clone());
                    true
                }
            };

            if changed {
                touched.insert(Category::ThemeConfigs);
                if *theme_id == state.current_theme {
                    touched.insert(Category::Theme);
                }
            }
        }

        // After the configs, so a patch may register a theme and select it.
        match &self.current_theme {
            Some(theme) if !state.theme_configs.contains_key(theme) => {
                warn!(theme = %theme, "ignoring current theme without a registered config");
            }
            _ => {
                if set_if_changed(&mut state.current_theme, &self.current_theme) {
                    touched.insert(Category::Theme);
                }
            }
        }

        let audio = &mut state.audio_config;
        let patch = &self.audio_config;
        let audio_changed = set_if_changed(&mut audio.enabled, &patch.enabled)
            | set_if_changed(&mut audio.volume_threshold, &patch.volume_threshold)
            | set_if_changed(&mut audio.sensitivity, &patch.sensitivity)
            | set_if_changed(&mut audio.show_visualizer, &patch.show_visualizer)
            | set_if_changed(&mut audio.trigger_cooldown, &patch.trigger_cooldown);
        if audio_changed {
            touched.insert(Category::Audio);
        }

        if !touched.is_empty() {
            touched.insert(Category::Global);
        }
        touched
    }
}

fn set_if_changed<T: PartialEq + Clone>(slot: &mut T, incoming: &Option<T>) -> bool {
    match incoming {
        Some(value) if slot != value => {
            *slot = value.clone();
            true
        }
        _ => false,
    }
}

/// Deep-merges `patch` into `target`, returning whether any leaf changed.
pub fn merge_object(target: &mut serde_json::Map<String, Value>, patch: &serde_json::Map<String, Value>) -> bool {
    let mut changed = false;
    for (key, incoming) in patch {
        match target.get_mut(key) {
            Some(existing) => changed |= merge_value(existing, incoming),
            None => {
                target.insert(key.clone(), incoming.clone());
                changed = true;
            }
        }
    }
    changed
}

/// Deep-merges `incoming` into `existing`.
///
/// Two objects recurse; anything else (scalars, arrays, null, or a type
/// change) is a leaf replaced only when [`values_equal`] says it differs.
pub fn merge_value(existing: &mut Value, incoming: &Value) -> bool {
    match (existing, incoming) {
        (Value::Object(target), Value::Object(patch)) => merge_object(target, patch),
        (slot, value) => {
            if !values_equal(slot, value) {
                *slot = value.clone();
                true
            } else {
                false
            }
        }
    }
}

/// Structural equality where numbers compare by numeric value.
///
/// `serde_json` keeps `150` and `150.0` apart; here they are equal, also
/// inside arrays and objects.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len() && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> ThemeConfig {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_patch() {
        assert!(StatePatch::new().is_empty());
        assert!(!StatePatch::new().with_running(false).is_empty());
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let mut state = AppState::default();
        let touched = StatePatch::new().with_running(false).apply(&mut state);
        assert!(touched.is_empty());
    }

    #[test]
    fn test_runtime_flag_touches_app_state() {
        let mut state = AppState::default();
        let touched = StatePatch::new().with_running(true).apply(&mut state);
        assert!(state.is_running());
        assert!(touched.contains(Category::Global));
        assert!(touched.contains(Category::AppState));
        assert!(!touched.contains(Category::Theme));
    }

    #[test]
    fn test_inactive_theme_config_skips_theme_category() {
        let mut state = AppState::default();
        let touched = StatePatch::new()
            .with_theme_param("rain", "speed", 3.0)
            .apply(&mut state);
        assert_eq!(
            touched.iter().collect::<Vec<_>>(),
            vec![Category::Global, Category::ThemeConfigs]
        );
    }

    #[test]
    fn test_active_theme_config_touches_theme() {
        let mut state = AppState::default();
        let touched = StatePatch::new()
            .with_theme_param("snow", "speed", 3.0)
            .apply(&mut state);
        assert!(touched.contains(Category::Theme));
        assert_eq!(state.theme_configs["snow"]["speed"], json!(3.0));
    }

    #[test]
    fn test_nested_objects_merge_field_by_field() {
        let mut target = object(json!({"a": {"x": 1, "y": 2}, "b": 1}));
        let changed = merge_object(&mut target, &object(json!({"a": {"y": 3}})));
        assert!(changed);
        assert_eq!(Value::Object(target), json!({"a": {"x": 1, "y": 3}, "b": 1}));
    }

    #[test]
    fn test_arrays_are_leaves_compared_by_value() {
        let mut target = object(json!({"palette": [{"c": "#fff"}, {"c": "#000"}]}));
        let same = object(json!({"palette": [{"c": "#fff"}, {"c": "#000"}]}));
        assert!(!merge_object(&mut target, &same));

        let shorter = object(json!({"palette": [{"c": "#fff"}]}));
        assert!(merge_object(&mut target, &shorter));
        assert_eq!(target["palette"], json!([{"c": "#fff"}]));
    }

    #[test]
    fn test_type_change_replaces_leaf() {
        let mut target = object(json!({"wind": {"x": 1}}));
        assert!(merge_object(&mut target, &object(json!({"wind": 0.5}))));
        assert_eq!(target["wind"], json!(0.5));
    }

    #[test]
    fn test_new_theme_config_is_inserted() {
        let mut state = AppState::default();
        let touched = StatePatch::new()
            .with_theme_config("aurora", object(json!({"hue": 140})))
            .apply(&mut state);
        assert!(touched.contains(Category::ThemeConfigs));
        assert_eq!(state.theme_configs["aurora"]["hue"], json!(140));
    }

    #[test]
    fn test_parse_from_json() {
        let patch: StatePatch = serde_json::from_value(json!({
            "isRunning": true,
            "audioConfig": {"sensitivity": 2.5},
            "themeConfigs": {"snow": {"count": 10}}
        }))
        .unwrap();
        assert_eq!(patch.is_running, Some(true));
        assert_eq!(patch.audio_config.sensitivity, Some(2.5));
        assert_eq!(patch.theme_configs["snow"]["count"], json!(10));

        let bad = serde_json::from_value::<StatePatch>(json!({"isRuning": true}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_equal_numbers_of_different_repr_are_not_a_change() {
        let mut target = object(json!({"count": 150, "wind": 0.0, "stops": [1, 2.5]}));
        let same = object(json!({"count": 150.0, "wind": 0, "stops": [1.0, 2.5]}));
        assert!(!merge_object(&mut target, &same));
        // The stored representation is kept
        assert_eq!(target["count"], json!(150));

        assert!(merge_object(&mut target, &object(json!({"count": 150.5}))));
        assert_eq!(target["count"], json!(150.5));
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [0, {"b": 2}]}), &json!({"a": [0.0, {"b": 2.0}]})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 1})));
        assert!(!values_equal(&json!(1), &json!("1")));
        assert!(!values_equal(&json!(-1), &json!(1)));
    }

    #[test]
    fn test_empty_config_for_new_theme_is_inserted() {
        let mut state = AppState::default();
        let touched = StatePatch::new()
            .with_theme_config("aurora", ThemeConfig::new())
            .apply(&mut state);
        assert!(touched.contains(Category::ThemeConfigs));
        assert!(state.theme_configs["aurora"].is_empty());

        let again = StatePatch::new()
            .with_theme_config("aurora", ThemeConfig::new())
            .apply(&mut state);
        assert!(again.is_empty());
    }

    #[test]
    fn test_current_theme_requires_registered_config() {
        let mut state = AppState::default();
        let touched = StatePatch::new().with_current_theme("nope").apply(&mut state);
        assert!(touched.is_empty());
        assert_eq!(state.current_theme, "snow");

        let touched = StatePatch::new()
            .with_theme_config("aurora", ThemeConfig::new())
            .with_current_theme("aurora")
            .apply(&mut state);
        assert!(touched.contains(Category::Theme));
        assert_eq!(state.current_theme, "aurora");
    }
}
