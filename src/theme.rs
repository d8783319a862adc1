//! Theme lifecycle coordination.
//!
//! The [`ThemeManager`] owns every registered theme, keeps exactly one of them
//! active, and keeps it in sync with the store: it observes the `theme` and
//! `appState` categories and starts, stops or swaps the active theme when
//! `currentTheme` or `isRunning` change.
//!
//! # Examples
//!
//! ```
//! use hushfall::{Bounds, ParticleTheme, StateManager, StatePatch, Theme, ThemeManager};
//!
//! let store = StateManager::new();
//! let manager = ThemeManager::new(store.clone());
//! manager.attach();
//! manager.register_theme("snow", Box::new(ParticleTheme::snow(Some(1))));
//! manager.init_themes(Bounds::new(640.0, 480.0));
//!
//! store.update_state(&StatePatch::new().with_running(true), "example");
//! assert_eq!(manager.with_current_theme(|t| t.is_running()), Some(true));
//! manager.detach();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::category::Category;
use crate::patch::StatePatch;
use crate::state::{AppState, ThemeConfig};
use crate::state_manager::{StateManager, Subscription};
use crate::traits::{Bounds, Canvas, StateObserver, Theme};

#[derive(Default)]
struct ThemeRegistry {
    themes: HashMap<String, Box<dyn Theme>>,
    current: Option<String>,
    bounds: Option<Bounds>,
}

impl ThemeRegistry {
    fn current_mut(&mut self) -> Option<&mut Box<dyn Theme>> {
        let id = self.current.as_ref()?;
        self.themes.get_mut(id)
    }

    /// Installs `id` as the active theme, stopping and cleaning up the
    /// previous one. The caller has checked that `id` is registered.
    fn install(&mut self, id: &str) {
        if let Some(previous) = self.current_mut() {
            previous.stop();
            previous.cleanup();
        }
        self.current = Some(id.to_string());
    }

    fn start_current(&mut self) -> bool {
        let bounds = self.bounds;
        let Some(theme) = self.current_mut() else {
            return false;
        };
        if !theme.is_initialized() {
            match bounds {
                Some(bounds) => theme.setup(bounds),
                None => {
                    debug!("theme has no bounds yet, start deferred");
                    return false;
                }
            }
        }
        theme.start();
        true
    }

    fn stop_current(&mut self) -> bool {
        match self.current_mut() {
            Some(theme) => {
                theme.stop();
                true
            }
            None => false,
        }
    }

    /// Switches and starts/stops to match `state`.
    fn reconcile(&mut self, state: &AppState) {
        if self.current.as_deref() != Some(state.current_theme.as_str()) {
            if self.themes.contains_key(&state.current_theme) {
                self.install(&state.current_theme);
                if let (Some(config), Some(theme)) = (state.current_theme_config(), self.current_mut()) {
                    theme.apply_config(config);
                }
            } else {
                warn!(theme = %state.current_theme, "state names an unregistered theme");
            }
        }

        if state.is_running() {
            self.start_current();
        } else {
            self.stop_current();
        }
    }
}

/// Owns the registered themes and drives the active one.
pub struct ThemeManager {
    store: Rc<StateManager>,
    registry: RefCell<ThemeRegistry>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl ThemeManager {
    pub fn new(store: Rc<StateManager>) -> Rc<Self> {
        Rc::new(Self {
            store,
            registry: RefCell::new(ThemeRegistry::default()),
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    /// Subscribes the manager to the `theme` and `appState` categories.
    pub fn attach(self: &Rc<Self>) {
        let mut subscriptions = self.subscriptions.borrow_mut();
        if !subscriptions.is_empty() {
            return;
        }
        for category in [Category::Theme, Category::AppState] {
            subscriptions.push(self.store.subscribe(self.clone(), category));
        }
    }

    /// Removes the manager's subscriptions. The store holds the manager
    /// through them, so this is also what releases it on teardown.
    pub fn detach(&self) {
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.borrow().is_empty()
    }

    /// Binds rendering bounds and brings the active theme in line with state.
    pub fn init_themes(&self, bounds: Bounds) {
        self.registry.borrow_mut().bounds = Some(bounds);
        if let Some(theme) = self.registry.borrow_mut().current_mut() {
            theme.setup(bounds);
        }
        self.apply_state();
    }

    /// Stores `theme` under `id`. Activates it if it is the state's current
    /// theme and nothing is active yet.
    ///
    /// A theme without a stored config gets an empty one, so the state can
    /// select it.
    pub fn register_theme(&self, id: &str, mut theme: Box<dyn Theme>) {
        match self.store.theme_config(id) {
            Some(config) => theme.apply_config(&config),
            None => {
                self.store.register_theme_config(id, ThemeConfig::new());
            }
        }

        let activate = {
            let mut registry = self.registry.borrow_mut();
            registry.themes.insert(id.to_string(), theme);
            registry.current.is_none() && self.store.get_state().current_theme == id
        };
        debug!(theme = id, "theme registered");

        if activate {
            self.switch_theme(id);
            let mut registry = self.registry.borrow_mut();
            if let Some(bounds) = registry.bounds {
                if let Some(theme) = registry.current_mut() {
                    theme.setup(bounds);
                }
            }
        }
    }

    /// Makes `id` the active theme. The previous theme is stopped and cleaned
    /// up; the new one is not started.
    pub fn switch_theme(&self, id: &str) -> bool {
        let mut registry = self.registry.borrow_mut();
        if !registry.themes.contains_key(id) {
            warn!(theme = id, "cannot switch to unregistered theme");
            return false;
        }

        registry.install(id);
        if let (Some(config), Some(theme)) = (self.store.theme_config(id), registry.current_mut()) {
            theme.apply_config(&config);
        }
        info!(theme = id, "switched theme");
        true
    }

    /// Reconciles the active theme with the store's current state.
    pub fn apply_state(&self) {
        let state = self.store.get_state();
        self.registry.borrow_mut().reconcile(&state);
    }

    pub fn start_current_theme(&self) -> bool {
        self.registry.borrow_mut().start_current()
    }

    pub fn stop_current_theme(&self) -> bool {
        self.registry.borrow_mut().stop_current()
    }

    /// Switches to `id`, re-runs its setup when bounds are bound, publishes
    /// the change to the store and resumes running if the previous theme was
    /// running and `preserve_running` is set.
    pub fn activate_theme(&self, id: &str, preserve_running: bool) -> bool {
        let was_running = {
            let mut registry = self.registry.borrow_mut();
            registry.current_mut().is_some_and(|theme| theme.is_running())
        };

        if !self.switch_theme(id) {
            return false;
        }

        {
            let mut registry = self.registry.borrow_mut();
            if let Some(bounds) = registry.bounds {
                if let Some(theme) = registry.current_mut() {
                    theme.setup(bounds);
                }
            }
        }

        // Round-trip through the store so other observers see the change.
        // The registry borrow is released: the store notifies this manager.
        let mut patch = StatePatch::new().with_current_theme(id);
        if was_running && !preserve_running {
            patch = patch.with_running(false);
        }
        self.store.update_state(&patch, "ThemeManager.activateTheme");

        if was_running && preserve_running {
            self.start_current_theme();
        }
        true
    }

    // ===== Frame driving =====

    /// Advances and draws the active theme. Returns false when no theme is
    /// running.
    pub fn frame(&self, dt: f32, canvas: &mut dyn Canvas) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(theme) = registry.current_mut() else {
            return false;
        };
        if !theme.is_running() {
            return false;
        }
        theme.update(dt);
        theme.draw(canvas);
        true
    }

    /// Updates the bounds. The first bounds ever received act like
    /// [`init_themes`](Self::init_themes).
    pub fn resize(&self, bounds: Bounds) {
        let first_bounds = {
            let mut registry = self.registry.borrow_mut();
            if registry.bounds == Some(bounds) {
                return;
            }
            let first = registry.bounds.replace(bounds).is_none();
            if let Some(theme) = registry.current_mut() {
                if theme.is_initialized() {
                    theme.resize(bounds);
                }
            }
            first
        };

        if first_bounds {
            self.apply_state();
        }
    }

    /// Forwards an audio pulse to the active theme.
    pub fn audio_pulse(&self, strength: f32) {
        if let Some(theme) = self.registry.borrow_mut().current_mut() {
            theme.audio_pulse(strength);
        }
    }

    // ===== Queries =====

    pub fn current_theme_id(&self) -> Option<String> {
        self.registry.borrow().current.clone()
    }

    /// Registered theme ids, sorted.
    pub fn theme_ids(&self) -> Vec<String> {
        let registry = self.registry.borrow();
        let mut ids: Vec<String> = registry.themes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Display name of a registered theme.
    pub fn theme_name(&self, id: &str) -> Option<String> {
        self.registry.borrow().themes.get(id).map(|theme| theme.name().to_string())
    }

    /// Runs `f` against the active theme.
    pub fn with_current_theme<R>(&self, f: impl FnOnce(&dyn Theme) -> R) -> Option<R> {
        let registry = self.registry.borrow();
        let id = registry.current.as_ref()?;
        registry.themes.get(id).map(|theme| f(theme.as_ref()))
    }
}

impl StateObserver for ThemeManager {
    fn on_state_change(&self, new_state: &AppState, old_state: &AppState) -> anyhow::Result<()> {
        let theme_changed = new_state.current_theme != old_state.current_theme;
        let running_changed = new_state.is_running() != old_state.is_running();

        if theme_changed || running_changed {
            self.registry.borrow_mut().reconcile(new_state);
        }

        // Parameter changes of the active theme
        if !theme_changed {
            if let Some(config) = new_state.current_theme_config() {
                if old_state.current_theme_config() != Some(config) {
                    if let Some(theme) = self.registry.borrow_mut().current_mut() {
                        theme.apply_config(config);
                    }
                }
            }
        }
        Ok(())
    }
}
