//! Wiring of the hushfall core for the GUI.
//!
//! Every collaborator receives the shared store at construction; nothing looks
//! it up globally.

use std::rc::Rc;
use std::time::Instant;

use hushfall::particles::BUILTIN_THEMES;
use hushfall::{
    AnimationLoop, AudioConfigBridge, AudioSource, Category, LaunchOptions, ParticleTheme, SimulatedAudio,
    StateManager, Subscription, ThemeManager, VolumeTrigger,
};
use tracing::{info, warn};

use crate::ui::audio_panel::SidebarAudioPanel;

/// Everything the window needs from one session.
pub struct AppContext {
    pub store: Rc<StateManager>,
    pub themes: Rc<ThemeManager>,
    pub animation: AnimationLoop,
    pub audio: Rc<AudioConfigBridge<SimulatedAudio>>,
    pub audio_panel: Rc<SidebarAudioPanel>,
    trigger: VolumeTrigger,
    subscriptions: Vec<Subscription>,
}

impl AppContext {
    pub fn new(options: &LaunchOptions) -> Self {
        let store = StateManager::with_state(options.initial_state());

        let themes = ThemeManager::new(store.clone());
        themes.attach();
        for id in BUILTIN_THEMES {
            if let Some(theme) = ParticleTheme::builtin(id, options.seed) {
                themes.register_theme(id, Box::new(theme));
            }
        }
        if let Some(requested) = &options.theme {
            if store.get_state().current_theme != *requested {
                warn!(theme = %requested, "unknown theme requested, keeping the default one");
            }
        }

        let audio = Rc::new(AudioConfigBridge::new(SimulatedAudio::new(options.seed.unwrap_or(7))));
        let initial_audio = store.get_state().audio_config;
        if let Err(err) = audio.sync(&initial_audio) {
            warn!(error = %err, "could not start audio source");
        }
        let audio_panel = Rc::new(SidebarAudioPanel::new(initial_audio));

        let subscriptions = vec![
            store.subscribe(audio.clone(), Category::Audio),
            store.subscribe(audio_panel.clone(), Category::Audio),
        ];

        info!(theme = ?themes.current_theme_id(), "session ready");

        Self {
            store,
            themes,
            animation: AnimationLoop::default(),
            audio,
            audio_panel,
            trigger: VolumeTrigger::new(),
            subscriptions,
        }
    }

    /// Samples the audio source once and forwards loud moments to the theme.
    pub fn pump_audio(&mut self, now: Instant) {
        let smoothed = {
            let mut source = self.audio.source_mut();
            if !source.is_listening() {
                return;
            }
            source.sample();
            source.smoothed_volume()
        };

        let config = self.store.get_state().audio_config;
        if let Some(strength) = self.trigger.observe(smoothed, &config, now) {
            self.themes.audio_pulse(strength);
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.themes.detach();
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }
}
