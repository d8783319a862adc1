//! Bridge between the store's `audioConfig` and an audio source.
//!
//! Capture itself lives outside this crate; anything able to report a volume
//! level implements [`AudioSource`]. The store only mirrors the user-facing
//! settings, and [`AudioConfigBridge`] pushes them into the source whenever the
//! `audio` category fires.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::state::{AppState, AudioConfig};
use crate::traits::StateObserver;

/// Number of smoothed samples kept for the visualizer.
pub const VOLUME_HISTORY_LEN: usize = 120;

/// Surface of an ambient audio level source (e.g. a microphone analyser).
pub trait AudioSource {
    fn is_initialized(&self) -> bool;
    fn is_listening(&self) -> bool;
    fn start_listening(&mut self) -> anyhow::Result<()>;
    fn stop_listening(&mut self);

    fn volume_threshold(&self) -> f64;
    fn set_volume_threshold(&mut self, threshold: f64);
    fn sensitivity(&self) -> f64;
    fn set_sensitivity(&mut self, sensitivity: f64);

    /// Latest raw level, 0..=1.
    fn current_volume(&self) -> f64;
    /// Exponentially smoothed level, 0..=1.
    fn smoothed_volume(&self) -> f64;
    /// Recent smoothed levels, oldest first.
    fn volume_history(&self) -> Vec<f64>;
}

/// Mirrors `audioConfig` into an [`AudioSource`].
///
/// Subscribe it to the `audio` category.
pub struct AudioConfigBridge<S: AudioSource> {
    source: RefCell<S>,
}

impl<S: AudioSource> AudioConfigBridge<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: RefCell::new(source),
        }
    }

    /// Pushes `config` into the source, starting or stopping capture.
    pub fn sync(&self, config: &AudioConfig) -> anyhow::Result<()> {
        let mut source = self.source.borrow_mut();
        source.set_volume_threshold(config.volume_threshold);
        source.set_sensitivity(config.sensitivity);

        if config.enabled && !source.is_listening() {
            source.start_listening()?;
            debug!("audio capture started");
        } else if !config.enabled && source.is_listening() {
            source.stop_listening();
            debug!("audio capture stopped");
        }
        Ok(())
    }

    pub fn source(&self) -> std::cell::Ref<'_, S> {
        self.source.borrow()
    }

    pub fn source_mut(&self) -> std::cell::RefMut<'_, S> {
        self.source.borrow_mut()
    }
}

impl<S: AudioSource> StateObserver for AudioConfigBridge<S> {
    fn on_state_change(&self, new_state: &AppState, old_state: &AppState) -> anyhow::Result<()> {
        if new_state.audio_config != old_state.audio_config {
            self.sync(&new_state.audio_config)?;
        }
        Ok(())
    }
}

/// Fires when the sensitivity-scaled level crosses the threshold, at most
/// once per cooldown.
#[derive(Debug, Default)]
pub struct VolumeTrigger {
    last_fired: Option<Instant>,
}

impl VolumeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pulse strength (0..=1) when the trigger fires.
    pub fn observe(&mut self, smoothed_volume: f64, config: &AudioConfig, now: Instant) -> Option<f32> {
        if !config.enabled {
            return None;
        }

        let level = (smoothed_volume * config.sensitivity).clamp(0.0, 1.0);
        if level < config.volume_threshold {
            return None;
        }

        let cooldown = Duration::from_millis(config.trigger_cooldown);
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < cooldown {
                return None;
            }
        }

        self.last_fired = Some(now);
        let headroom = (1.0 - config.volume_threshold).max(f64::EPSILON);
        Some(((level - config.volume_threshold) / headroom).clamp(0.1, 1.0) as f32)
    }
}

/// Noise-driven stand-in for a microphone, used when no capture backend is
/// wired in.
pub struct SimulatedAudio {
    rng: StdRng,
    listening: bool,
    threshold: f64,
    sensitivity: f64,
    current: f64,
    smoothed: f64,
    history: VecDeque<f64>,
}

impl SimulatedAudio {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            listening: false,
            threshold: AudioConfig::default().volume_threshold,
            sensitivity: AudioConfig::default().sensitivity,
            current: 0.0,
            smoothed: 0.0,
            history: VecDeque::with_capacity(VOLUME_HISTORY_LEN),
        }
    }

    /// Produces the next sample. Silent while not listening.
    pub fn sample(&mut self) -> f64 {
        self.current = if self.listening {
            // Mostly quiet with occasional loud bursts
            let base = self.rng.gen_range(0.0..0.25);
            if self.rng.gen_bool(0.03) {
                base + self.rng.gen_range(0.4..0.75)
            } else {
                base
            }
        } else {
            0.0
        };

        self.smoothed = self.smoothed * 0.8 + self.current * 0.2;
        if self.history.len() == VOLUME_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(self.smoothed);
        self.current
    }
}

impl AudioSource for SimulatedAudio {
    fn is_initialized(&self) -> bool {
        true
    }

    fn is_listening(&self) -> bool {
        self.listening
    }

    fn start_listening(&mut self) -> anyhow::Result<()> {
        self.listening = true;
        Ok(())
    }

    fn stop_listening(&mut self) {
        self.listening = false;
    }

    fn volume_threshold(&self) -> f64 {
        self.threshold
    }

    fn set_volume_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    fn set_sensitivity(&mut self, sensitivity: f64) {
        self.sensitivity = sensitivity.max(0.0);
    }

    fn current_volume(&self) -> f64 {
        self.current
    }

    fn smoothed_volume(&self) -> f64 {
        self.smoothed
    }

    fn volume_history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::patch::{AudioConfigPatch, StatePatch};
    use crate::state_manager::StateManager;
    use std::rc::Rc;

    fn enabled_config() -> AudioConfig {
        AudioConfig {
            enabled: true,
            volume_threshold: 0.5,
            sensitivity: 1.0,
            show_visualizer: true,
            trigger_cooldown: 200,
        }
    }

    #[test]
    fn test_trigger_respects_threshold_and_cooldown() {
        let config = enabled_config();
        let mut trigger = VolumeTrigger::new();
        let start = Instant::now();

        assert_eq!(trigger.observe(0.2, &config, start), None);
        assert!(trigger.observe(0.9, &config, start).is_some());
        assert_eq!(trigger.observe(0.9, &config, start + Duration::from_millis(100)), None);
        assert!(trigger.observe(0.9, &config, start + Duration::from_millis(250)).is_some());
    }

    #[test]
    fn test_trigger_applies_sensitivity() {
        let mut config = enabled_config();
        let mut trigger = VolumeTrigger::new();
        let now = Instant::now();
        assert_eq!(trigger.observe(0.3, &config, now), None);
        config.sensitivity = 2.0;
        assert!(trigger.observe(0.3, &config, now).is_some());
    }

    #[test]
    fn test_disabled_trigger_never_fires() {
        let mut config = enabled_config();
        config.enabled = false;
        assert_eq!(VolumeTrigger::new().observe(1.0, &config, Instant::now()), None);
    }

    #[test]
    fn test_bridge_mirrors_config() {
        let store = StateManager::new();
        let bridge = Rc::new(AudioConfigBridge::new(SimulatedAudio::new(9)));
        store.subscribe(bridge.clone(), Category::Audio);

        let patch = StatePatch::new().with_audio(AudioConfigPatch {
            enabled: Some(true),
            sensitivity: Some(1.7),
            ..Default::default()
        });
        assert!(store.update_state(&patch, "test"));
        assert!(bridge.source().is_listening());
        assert_eq!(bridge.source().sensitivity(), 1.7);

        let patch = StatePatch::new().with_audio(AudioConfigPatch {
            enabled: Some(false),
            ..Default::default()
        });
        store.update_state(&patch, "test");
        assert!(!bridge.source().is_listening());
    }

    #[test]
    fn test_simulated_audio_history_is_bounded() {
        let mut audio = SimulatedAudio::new(1);
        assert_eq!(audio.sample(), 0.0);
        audio.start_listening().unwrap();
        for _ in 0..(VOLUME_HISTORY_LEN * 2) {
            let v = audio.sample();
            assert!((0.0..=1.0).contains(&v));
        }
        assert_eq!(audio.volume_history().len(), VOLUME_HISTORY_LEN);
        assert!(audio.smoothed_volume() > 0.0);
    }
}
