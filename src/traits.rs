use egui::{Color32, Pos2};

use crate::state::{AppState, ThemeConfig};

/// Participant in state notifications.
///
/// Observers are registered against a [`Category`](crate::Category) and called
/// synchronously with the new and previous state snapshots after every update
/// that implicates that category. Observers are shared (`Rc`) and use interior
/// mutability for their own state, which lets them call back into the store.
///
/// An `Err` (or a panic) is caught by the store and does not stop the
/// remaining observers from being notified.
pub trait StateObserver {
    fn on_state_change(&self, new_state: &AppState, old_state: &AppState) -> anyhow::Result<()>;
}

/// Size of the rendering surface in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Drawing surface handed to themes each frame.
///
/// The GUI implements this over an `egui::Painter`; the simulator and tests
/// use a recording implementation.
pub trait Canvas {
    fn bounds(&self) -> Bounds;

    /// Fills the whole surface.
    fn clear(&mut self, color: Color32);

    fn fill_circle(&mut self, center: Pos2, radius: f32, color: Color32);

    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32);
}

/// Lifecycle of a theme instance.
///
/// `Uninitialized -> setup -> Stopped <-> Running -> cleanup -> Uninitialized`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeLifecycle {
    Uninitialized,
    Stopped,
    Running,
}

/// A pluggable visual mode owning its own animated entities.
///
/// `update` and `draw` must be no-ops unless the theme is `Running`.
pub trait Theme {
    /// Display name shown in the sidebar.
    fn name(&self) -> &str;

    /// Allocates entities for the given bounds. Moves the theme to `Stopped`
    /// (or keeps it `Running` if it already was).
    fn setup(&mut self, bounds: Bounds);

    /// Advances the simulation by `dt` seconds.
    fn update(&mut self, dt: f32);

    fn draw(&self, canvas: &mut dyn Canvas);

    fn start(&mut self);

    fn stop(&mut self);

    /// Releases entities. Terminal for the current activation.
    fn cleanup(&mut self);

    fn lifecycle(&self) -> ThemeLifecycle;

    fn is_running(&self) -> bool {
        self.lifecycle() == ThemeLifecycle::Running
    }

    /// Whether `setup` has bound rendering resources.
    fn is_initialized(&self) -> bool {
        self.lifecycle() != ThemeLifecycle::Uninitialized
    }

    /// Applies a (possibly partial) theme config.
    fn apply_config(&mut self, _config: &ThemeConfig) {}

    /// Reacts to a loud moment in the ambient audio. `strength` is in 0..=1.
    fn audio_pulse(&mut self, _strength: f32) {}

    /// Adapts to new bounds without discarding the entity collection.
    fn resize(&mut self, bounds: Bounds) {
        self.setup(bounds);
    }
}
