//! Particle-field themes (falling snow, rain).
//!
//! Each theme owns a collection of independently simulated particles. The
//! sidebar-facing settings (count, size, speed, wobble, wind, color) are
//! multipliers applied identically to every particle, so each particle only
//! stores its own base values and derives the rest.

use std::f32::consts::TAU;

use egui::{Color32, Pos2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tracing::debug;

use crate::color;
use crate::state::ThemeConfig;
use crate::traits::{Bounds, Canvas, Theme, ThemeLifecycle};

pub const SNOW: &str = "snow";
pub const RAIN: &str = "rain";

/// Theme ids registered by default.
pub const BUILTIN_THEMES: [&str; 2] = [SNOW, RAIN];

/// Upper bound for the `count` setting.
pub const MAX_PARTICLES: usize = 2000;

/// Horizontal drift in points per frame for `wind == 1.0` on a size-1 particle.
const WIND_STRENGTH: f32 = 1.5;
/// Peak extra wind added by a full-strength audio pulse.
const GUST_STRENGTH: f32 = 3.0;
/// Fraction of the gust that survives one 60 Hz frame.
const GUST_DECAY: f32 = 0.96;

/// Default theme config for one of the built-in ids.
pub fn default_config(theme_id: &str) -> ThemeConfig {
    let value = match theme_id {
        RAIN => json!({
            "color": "#9fb8d0",
            "count": 250,
            "size": 1.0,
            "speed": 1.0,
            "wobble": 0.2,
            "wind": 0.3
        }),
        _ => json!({
            "color": "#ffffff",
            "count": 150,
            "size": 1.0,
            "speed": 1.0,
            "wobble": 1.0,
            "wind": 0.0
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => ThemeConfig::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    Snowflake,
    Raindrop,
}

/// Multipliers shared by all particles of a theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSettings {
    pub count: usize,
    pub size: f32,
    pub speed: f32,
    pub wobble: f32,
    pub wind: f32,
    pub color: Color32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: 150,
            size: 1.0,
            speed: 1.0,
            wobble: 1.0,
            wind: 0.0,
            color: Color32::WHITE,
        }
    }
}

/// A single falling particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub base_size: f32,
    pub size: f32,
    pub base_speed: f32,
    pub speed: f32,
    pub wobble_phase: f32,
    pub wobble_amplitude: f32,
    pub wobble_rate: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub opacity: f32,
}

impl Particle {
    fn spawn(rng: &mut StdRng, shape: ParticleShape, bounds: Bounds, settings: &ParticleSettings, anywhere: bool) -> Self {
        let (base_size, base_speed, wobble_amplitude) = match shape {
            ParticleShape::Snowflake => (rng.gen_range(1.5..4.5), rng.gen_range(0.5..1.5), rng.gen_range(0.3..1.2)),
            ParticleShape::Raindrop => (rng.gen_range(1.0..2.5), rng.gen_range(6.0..10.0), rng.gen_range(0.0..0.3)),
        };

        let mut particle = Self {
            x: rng.gen_range(0.0..bounds.width.max(1.0)),
            y: 0.0,
            base_size,
            size: base_size * settings.size,
            base_speed,
            speed: base_speed * settings.speed,
            wobble_phase: rng.gen_range(0.0..TAU),
            wobble_amplitude,
            wobble_rate: rng.gen_range(0.01..0.04),
            rotation: rng.gen_range(0.0..TAU),
            rotation_speed: rng.gen_range(-0.02..0.02),
            opacity: rng.gen_range(0.5..1.0),
        };

        if anywhere {
            particle.y = rng.gen_range(0.0..bounds.height.max(1.0));
        } else {
            particle.place_above_top(rng, bounds);
        }
        particle
    }

    /// Moves the particle to a random height above the visible area with a
    /// fresh wobble phase, so respawns do not line up into visible waves.
    fn place_above_top(&mut self, rng: &mut StdRng, bounds: Bounds) {
        let spread = (bounds.height * 0.3).max(1.0);
        self.x = rng.gen_range(0.0..bounds.width.max(1.0));
        self.y = -self.size - rng.gen_range(0.0..spread);
        self.wobble_phase = rng.gen_range(0.0..TAU);
    }

    fn apply_settings(&mut self, settings: &ParticleSettings) {
        self.size = self.base_size * settings.size;
        self.speed = self.base_speed * settings.speed;
    }
}

/// A theme rendering a field of falling particles.
pub struct ParticleTheme {
    name: String,
    shape: ParticleShape,
    settings: ParticleSettings,
    background: Color32,
    particles: Vec<Particle>,
    bounds: Option<Bounds>,
    lifecycle: ThemeLifecycle,
    gust: f32,
    rng: StdRng,
}

impl ParticleTheme {
    pub fn new(name: impl Into<String>, shape: ParticleShape, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            shape,
            settings: ParticleSettings::default(),
            background: Color32::from_rgb(10, 14, 30),
            particles: Vec::new(),
            bounds: None,
            lifecycle: ThemeLifecycle::Uninitialized,
            gust: 0.0,
            rng,
        }
    }

    /// Falling snow with the default snow config applied.
    pub fn snow(seed: Option<u64>) -> Self {
        let mut theme = Self::new("Snowfall", ParticleShape::Snowflake, make_rng(seed));
        theme.apply_config(&default_config(SNOW));
        theme
    }

    /// Rain with the default rain config applied.
    pub fn rain(seed: Option<u64>) -> Self {
        let mut theme = Self::new("Rain", ParticleShape::Raindrop, make_rng(seed));
        theme.background = Color32::from_rgb(16, 20, 28);
        theme.apply_config(&default_config(RAIN));
        theme
    }

    /// Built-in theme for `id`, if there is one.
    pub fn builtin(id: &str, seed: Option<u64>) -> Option<Self> {
        match id {
            SNOW => Some(Self::snow(seed)),
            RAIN => Some(Self::rain(seed)),
            _ => None,
        }
    }

    pub fn shape(&self) -> ParticleShape {
        self.shape
    }

    pub fn settings(&self) -> &ParticleSettings {
        &self.settings
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn gust(&self) -> f32 {
        self.gust
    }

    /// Adds or removes particles to reach `count`. New particles start above
    /// the top edge with the current multipliers.
    pub fn set_count(&mut self, count: usize) {
        let count = count.min(MAX_PARTICLES);
        self.settings.count = count;

        let Some(bounds) = self.bounds else {
            return;
        };

        if count < self.particles.len() {
            self.particles.truncate(count);
        } else {
            while self.particles.len() < count {
                let particle = Particle::spawn(&mut self.rng, self.shape, bounds, &self.settings, false);
                self.particles.push(particle);
            }
        }
    }

    pub fn set_size(&mut self, multiplier: f32) {
        self.settings.size = multiplier.max(0.0);
        self.refresh_particles();
    }

    pub fn set_speed(&mut self, multiplier: f32) {
        self.settings.speed = multiplier.max(0.0);
        self.refresh_particles();
    }

    pub fn set_wobble(&mut self, multiplier: f32) {
        self.settings.wobble = multiplier.max(0.0);
    }

    pub fn set_wind(&mut self, wind: f32) {
        self.settings.wind = wind;
    }

    pub fn set_color(&mut self, color: Color32) {
        self.settings.color = color;
    }

    fn refresh_particles(&mut self) {
        let settings = self.settings;
        for particle in &mut self.particles {
            particle.apply_settings(&settings);
        }
    }

    fn populate(&mut self, bounds: Bounds) {
        self.particles.clear();
        for _ in 0..self.settings.count {
            let particle = Particle::spawn(&mut self.rng, self.shape, bounds, &self.settings, true);
            self.particles.push(particle);
        }
    }

    fn draw_snowflake(&self, canvas: &mut dyn Canvas, particle: &Particle) {
        let color = color::with_alpha(self.settings.color, (particle.opacity * 255.0) as u8);
        let center = Pos2::new(particle.x, particle.y);
        canvas.fill_circle(center, particle.size * 0.6, color);

        // Larger flakes get six arms
        if particle.size >= 2.5 {
            let arm = particle.size * 1.6;
            for i in 0..3 {
                let angle = particle.rotation + i as f32 * TAU / 6.0;
                let (sin, cos) = angle.sin_cos();
                let from = Pos2::new(particle.x - cos * arm, particle.y - sin * arm);
                let to = Pos2::new(particle.x + cos * arm, particle.y + sin * arm);
                canvas.line(from, to, 1.0, color);
            }
        }
    }

    fn draw_raindrop(&self, canvas: &mut dyn Canvas, particle: &Particle) {
        let color = color::with_alpha(self.settings.color, (particle.opacity * 200.0) as u8);
        let length = particle.size * 6.0;
        let slant = (self.settings.wind + self.gust) * WIND_STRENGTH;
        let from = Pos2::new(particle.x, particle.y);
        let to = Pos2::new(particle.x + slant * 2.0, particle.y + length);
        canvas.line(from, to, (particle.size * 0.6).max(0.5), color);
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn config_f32(config: &ThemeConfig, key: &str) -> Option<f32> {
    config.get(key).and_then(Value::as_f64).map(|v| v as f32)
}

impl Theme for ParticleTheme {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
        self.populate(bounds);
        if self.lifecycle == ThemeLifecycle::Uninitialized {
            self.lifecycle = ThemeLifecycle::Stopped;
        }
        debug!(theme = %self.name, particles = self.particles.len(), "theme set up");
    }

    fn update(&mut self, dt: f32) {
        if self.lifecycle != ThemeLifecycle::Running {
            return;
        }
        let Some(bounds) = self.bounds else {
            return;
        };

        // Physics constants are tuned per 60 Hz frame
        let frame_scale = dt * 60.0;
        let wind = self.settings.wind + self.gust;

        for particle in &mut self.particles {
            particle.wobble_phase += particle.wobble_rate * frame_scale;
            let drift = particle.wobble_phase.sin() * particle.wobble_amplitude * self.settings.wobble;
            // Smaller particles are pushed around more
            let push = wind * WIND_STRENGTH / particle.size.max(0.5);

            particle.x += (drift + push) * frame_scale;
            particle.y += particle.speed * frame_scale;
            particle.rotation += particle.rotation_speed * frame_scale;

            if particle.x > bounds.width + particle.size {
                particle.x = -particle.size;
            } else if particle.x < -particle.size {
                particle.x = bounds.width + particle.size;
            }

            if particle.y > bounds.height + particle.size {
                particle.place_above_top(&mut self.rng, bounds);
            }
        }

        self.gust *= GUST_DECAY.powf(frame_scale);
        if self.gust < 0.001 {
            self.gust = 0.0;
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        if self.lifecycle != ThemeLifecycle::Running {
            return;
        }

        canvas.clear(self.background);
        for particle in &self.particles {
            match self.shape {
                ParticleShape::Snowflake => self.draw_snowflake(canvas, particle),
                ParticleShape::Raindrop => self.draw_raindrop(canvas, particle),
            }
        }
    }

    fn start(&mut self) {
        if self.lifecycle == ThemeLifecycle::Stopped {
            self.lifecycle = ThemeLifecycle::Running;
        }
    }

    fn stop(&mut self) {
        if self.lifecycle == ThemeLifecycle::Running {
            self.lifecycle = ThemeLifecycle::Stopped;
        }
    }

    fn cleanup(&mut self) {
        self.particles.clear();
        self.bounds = None;
        self.gust = 0.0;
        self.lifecycle = ThemeLifecycle::Uninitialized;
    }

    fn lifecycle(&self) -> ThemeLifecycle {
        self.lifecycle
    }

    fn apply_config(&mut self, config: &ThemeConfig) {
        if let Some(color) = config.get("color").and_then(Value::as_str).and_then(color::parse_hex) {
            self.set_color(color);
        }
        if let Some(size) = config_f32(config, "size") {
            self.set_size(size);
        }
        if let Some(speed) = config_f32(config, "speed") {
            self.set_speed(speed);
        }
        if let Some(wobble) = config_f32(config, "wobble") {
            self.set_wobble(wobble);
        }
        if let Some(wind) = config_f32(config, "wind") {
            self.set_wind(wind);
        }
        if let Some(count) = config.get("count").and_then(Value::as_f64) {
            self.set_count(count.max(0.0) as usize);
        }
    }

    fn audio_pulse(&mut self, strength: f32) {
        let gust = strength.clamp(0.0, 1.0) * GUST_STRENGTH;
        self.gust = self.gust.max(gust);
    }

    fn resize(&mut self, bounds: Bounds) {
        let Some(old) = self.bounds else {
            self.setup(bounds);
            return;
        };
        if old.is_empty() {
            self.setup(bounds);
            return;
        }

        let scale_x = bounds.width / old.width;
        let scale_y = bounds.height / old.height;
        for particle in &mut self.particles {
            particle.x *= scale_x;
            particle.y *= scale_y;
        }
        self.bounds = Some(bounds);
    }
}
