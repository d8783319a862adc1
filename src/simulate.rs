use anyhow::{bail, Result};
use egui::{Color32, Pos2};
use hushfall::particles::BUILTIN_THEMES;
use hushfall::{
    logging, AnimationLoop, AudioConfigBridge, AudioSource, Bounds, Canvas, Category, LaunchOptions, ParticleTheme,
    SimulatedAudio, StateManager, StatePatch, ThemeManager, VolumeTrigger,
};
use std::rc::Rc;
use std::time::{Duration, Instant};

const DEFAULT_FRAMES: u64 = 600;
const SURFACE: Bounds = Bounds { width: 1280.0, height: 720.0 };

/// Canvas that only counts primitives.
#[derive(Default)]
struct TallyCanvas {
    clears: u64,
    circles: u64,
    lines: u64,
}

impl Canvas for TallyCanvas {
    fn bounds(&self) -> Bounds {
        SURFACE
    }

    fn clear(&mut self, _color: Color32) {
        self.clears += 1;
    }

    fn fill_circle(&mut self, _center: Pos2, _radius: f32, _color: Color32) {
        self.circles += 1;
    }

    fn line(&mut self, _from: Pos2, _to: Pos2, _width: f32, _color: Color32) {
        self.lines += 1;
    }
}

fn main() -> Result<()> {
    let options = LaunchOptions::from_env()?;
    if options.help {
        println!("{}", LaunchOptions::usage("hushfall-sim"));
        return Ok(());
    }
    logging::init_logging(options.debug);

    let frames = options.frames.unwrap_or(DEFAULT_FRAMES);
    let seed = options.seed.unwrap_or(42);

    let store = StateManager::with_state(options.initial_state());
    let themes = ThemeManager::new(store.clone());
    themes.attach();
    for id in BUILTIN_THEMES {
        if let Some(theme) = ParticleTheme::builtin(id, Some(seed)) {
            themes.register_theme(id, Box::new(theme));
        }
    }
    if let Some(theme) = &options.theme {
        if !BUILTIN_THEMES.contains(&theme.as_str()) {
            bail!("unknown theme '{}' (available: {})", theme, themes.theme_ids().join(", "));
        }
    }
    let requested = store.get_state().current_theme;
    themes.init_themes(SURFACE);

    let audio = Rc::new(AudioConfigBridge::new(SimulatedAudio::new(seed)));
    audio.sync(&store.get_state().audio_config)?;
    let audio_subscription = store.subscribe(audio.clone(), Category::Audio);

    let mut animation = AnimationLoop::fixed_60hz();
    let mut trigger = VolumeTrigger::new();
    let mut canvas = TallyCanvas::default();
    let mut pulses = 0u64;

    // Simulated clock so cooldowns behave as if running in real time
    let start = Instant::now();
    let step = Duration::from_micros(16_667);

    for frame in 0..frames {
        let now = start + step * frame as u32;

        if frame == frames / 2 {
            // Halfway through, switch to the other built-in theme
            let other = BUILTIN_THEMES.iter().find(|id| **id != requested).copied();
            if let Some(other) = other {
                themes.activate_theme(other, true);
            }
            store.update_state(&StatePatch::new().with_theme_param(requested.as_str(), "speed", 2.0), "sim");
        }

        let smoothed = {
            let mut source = audio.source_mut();
            if source.is_listening() {
                source.sample();
            }
            source.smoothed_volume()
        };
        if let Some(strength) = trigger.observe(smoothed, &store.get_state().audio_config, now) {
            themes.audio_pulse(strength);
            pulses += 1;
        }

        animation.tick(now, &themes, &mut canvas);
    }

    println!("Simulated {} frame(s), {} drawn", frames, animation.frames());
    println!("Active theme: {}", themes.current_theme_id().unwrap_or_default());
    println!("Primitives: {} clears, {} circles, {} lines", canvas.clears, canvas.circles, canvas.lines);
    println!("Audio pulses: {}", pulses);
    if store.is_debug() {
        println!("{}", store.debug_report());
    }

    audio_subscription.unsubscribe();
    themes.detach();
    Ok(())
}
