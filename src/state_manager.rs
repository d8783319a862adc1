//! Central state store with category-scoped observer notification.
//!
//! The store owns the only mutable [`AppState`]. All mutation goes through
//! [`StateManager::update_state`], which deep-merges a [`StatePatch`], works
//! out which [`Category`]s the changed leaves implicate, records a history
//! entry when debugging, and then synchronously notifies the observers of
//! those categories.
//!
//! # Examples
//!
//! ```
//! use hushfall::{Category, StateManager, StatePatch};
//!
//! let store = StateManager::new();
//! assert!(store.update_state(&StatePatch::new().with_running(true), "example"));
//! assert!(store.get_state().is_running());
//! assert_eq!(store.observer_count(Category::Global), 0);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::category::{Category, CategorySet};
use crate::history::{ChangeHistory, ChangeRecord};
use crate::patch::StatePatch;
use crate::state::{AppState, ThemeConfig};
use crate::traits::StateObserver;

/// Shared observer handle.
pub type ObserverHandle = Rc<dyn StateObserver>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown observer category '{0}'")]
    UnknownCategory(String),

    #[error("invalid state patch: {0}")]
    InvalidPatch(String),
}

#[derive(Default)]
struct ObserverRegistry {
    by_category: HashMap<Category, Vec<ObserverHandle>>,
}

impl ObserverRegistry {
    fn add(&mut self, observer: ObserverHandle, category: Category) {
        self.by_category.entry(category).or_default().push(observer);
    }

    /// Removes one registration of `observer`; a handle subscribed twice
    /// needs two removals.
    fn remove(&mut self, observer: &ObserverHandle, category: Category) {
        if let Some(list) = self.by_category.get_mut(&category) {
            if let Some(index) = list.iter().position(|existing| same_observer(existing, observer)) {
                list.remove(index);
            }
        }
    }

    fn len(&self, category: Category) -> usize {
        self.by_category.get(&category).map_or(0, Vec::len)
    }

    /// Observers of the given categories, in notification order.
    fn collect(&self, categories: CategorySet) -> Vec<(Category, ObserverHandle)> {
        categories
            .iter()
            .flat_map(|category| {
                self.by_category
                    .get(&category)
                    .into_iter()
                    .flatten()
                    .map(move |observer| (category, Rc::clone(observer)))
            })
            .collect()
    }
}

fn same_observer(a: &ObserverHandle, b: &ObserverHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Token returned by [`StateManager::subscribe`].
///
/// Dropping the token keeps the registration; call [`Subscription::unsubscribe`]
/// to remove it.
pub struct Subscription {
    observer: ObserverHandle,
    category: Category,
    registry: Weak<RefCell<ObserverRegistry>>,
}

impl Subscription {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(&self.observer, self.category);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Single source of truth for application state.
pub struct StateManager {
    state: RefCell<AppState>,
    observers: Rc<RefCell<ObserverRegistry>>,
    history: RefCell<ChangeHistory>,
    last_update: Cell<Option<Instant>>,
}

impl StateManager {
    /// Creates a store holding the default state.
    pub fn new() -> Rc<Self> {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(state),
            observers: Rc::new(RefCell::new(ObserverRegistry::default())),
            history: RefCell::new(ChangeHistory::new()),
            last_update: Cell::new(None),
        })
    }

    // ===== Observers =====

    /// Registers `observer` for `category`, after any observers already there.
    pub fn subscribe(&self, observer: ObserverHandle, category: Category) -> Subscription {
        self.observers.borrow_mut().add(Rc::clone(&observer), category);
        debug!(%category, "observer subscribed");
        Subscription {
            observer,
            category,
            registry: Rc::downgrade(&self.observers),
        }
    }

    /// Like [`subscribe`](Self::subscribe) with the category given by name.
    pub fn subscribe_named(&self, observer: ObserverHandle, category: &str) -> Result<Subscription, StateError> {
        let category = category.parse::<Category>()?;
        Ok(self.subscribe(observer, category))
    }

    /// Removes `observer` from `category`. No-op if it is not registered.
    pub fn unsubscribe(&self, observer: &ObserverHandle, category: Category) {
        self.observers.borrow_mut().remove(observer, category);
    }

    pub fn observer_count(&self, category: Category) -> usize {
        self.observers.borrow().len(category)
    }

    // ===== Updates =====

    /// Deep-merges `changes` into the state and notifies affected observers.
    ///
    /// Returns true iff at least one leaf value actually changed.
    pub fn update_state(&self, changes: &StatePatch, source: &str) -> bool {
        if changes.is_empty() {
            return false;
        }

        let (old_state, new_state, categories) = {
            let mut state = self.state.borrow_mut();
            let before = state.clone();
            let categories = changes.apply(&mut state);
            if categories.is_empty() {
                return false;
            }
            (before, state.clone(), categories)
        };

        let now = Instant::now();
        let since_previous = self.last_update.replace(Some(now)).map(|prev| now.duration_since(prev));

        if new_state.debug {
            let record = ChangeRecord::new(source, since_previous, old_state.clone(), new_state.clone());
            debug!(source, changes = record.diff.len(), "state updated");
            self.history.borrow_mut().push(record);
        }

        self.notify(categories, &new_state, &old_state, source);
        true
    }

    /// Parses a JSON patch and applies it with [`update_state`](Self::update_state).
    pub fn update_state_json(&self, changes: Value, source: &str) -> Result<bool, StateError> {
        let patch: StatePatch =
            serde_json::from_value(changes).map_err(|e| StateError::InvalidPatch(e.to_string()))?;
        Ok(self.update_state(&patch, source))
    }

    /// Runs each observer in isolation. `Err` returns and panics are both
    /// caught and logged only in debug mode; a panic message still goes
    /// through the process panic hook, which is left untouched.
    fn notify(&self, categories: CategorySet, new_state: &AppState, old_state: &AppState, source: &str) {
        // No borrow of the registry or the state is held while observers run,
        // so they may subscribe, unsubscribe or update again.
        let targets = self.observers.borrow().collect(categories);
        let log_faults = new_state.debug;

        for (category, observer) in targets {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_state_change(new_state, old_state)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) if log_faults => {
                    warn!(%category, source, error = %err, "observer failed");
                }
                Err(_) if log_faults => {
                    warn!(%category, source, "observer panicked");
                }
                _ => {}
            }
        }
    }

    // ===== Queries =====

    /// Independent copy of the whole state.
    pub fn get_state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Value at a dot-delimited path of the JSON view, or `None` if any
    /// segment is missing.
    pub fn get_state_section(&self, path: &str) -> Option<Value> {
        self.state.borrow().section(path)
    }

    /// Copy of the active theme's config, or an empty map.
    pub fn get_current_theme_config(&self) -> ThemeConfig {
        self.state.borrow().current_theme_config().cloned().unwrap_or_default()
    }

    pub fn theme_config(&self, theme: &str) -> Option<ThemeConfig> {
        self.state.borrow().theme_configs.get(theme).cloned()
    }

    pub fn is_debug(&self) -> bool {
        self.state.borrow().debug
    }

    // ===== Convenience mutations =====

    /// Sets `themeConfigs.<theme>.<param>`, defaulting to the active theme.
    ///
    /// Returns false if the theme has no registered config or nothing changed.
    pub fn set_theme_param(&self, param: &str, value: impl Into<Value>, theme: Option<&str>) -> bool {
        let theme = match theme {
            Some(theme) => theme.to_string(),
            None => self.state.borrow().current_theme.clone(),
        };

        if !self.state.borrow().theme_configs.contains_key(&theme) {
            warn!(theme = %theme, param, "cannot set parameter of unregistered theme");
            return false;
        }

        let patch = StatePatch::new().with_theme_param(theme, param, value);
        self.update_state(&patch, "setThemeParam")
    }

    /// Adds (or merges into) the config of `theme`.
    pub fn register_theme_config(&self, theme: &str, config: ThemeConfig) -> bool {
        self.update_state(&StatePatch::new().with_theme_config(theme, config), "registerThemeConfig")
    }

    // ===== Debug history =====

    pub fn history(&self) -> Vec<ChangeRecord> {
        self.history.borrow().iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn clear_history(&self) {
        self.history.borrow_mut().clear();
    }

    /// Human-readable dump of the state, observer counts and recent history.
    pub fn debug_report(&self) -> String {
        let mut report = String::new();
        let state = self.state.borrow();
        let pretty = serde_json::to_string_pretty(&*state).unwrap_or_default();
        let _ = writeln!(report, "state:\n{}", pretty);

        let observers = self.observers.borrow();
        for category in Category::ALL {
            let _ = writeln!(report, "observers[{}] = {}", category, observers.len(category));
        }

        let history = self.history.borrow();
        let _ = writeln!(report, "history: {} record(s)", history.len());
        for record in history.iter().rev().take(10) {
            let _ = writeln!(report, "  [{}] {} change(s)", record.source, record.diff.len());
            for entry in &record.diff {
                let _ = writeln!(report, "    {}", entry);
            }
        }
        report
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("state", &self.state.borrow())
            .field("history_len", &self.history_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_CAPACITY;
    use serde_json::json;

    /// Observer recording every notification it receives.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(AppState, AppState)>>,
    }

    impl StateObserver for Recorder {
        fn on_state_change(&self, new_state: &AppState, old_state: &AppState) -> anyhow::Result<()> {
            self.calls.borrow_mut().push((new_state.clone(), old_state.clone()));
            Ok(())
        }
    }

    struct Failing;

    impl StateObserver for Failing {
        fn on_state_change(&self, _: &AppState, _: &AppState) -> anyhow::Result<()> {
            anyhow::bail!("observer exploded")
        }
    }

    struct Panicking;

    impl StateObserver for Panicking {
        fn on_state_change(&self, _: &AppState, _: &AppState) -> anyhow::Result<()> {
            panic!("observer panicked")
        }
    }

    fn recorder(store: &StateManager, category: Category) -> Rc<Recorder> {
        let recorder = Rc::new(Recorder::default());
        store.subscribe(recorder.clone(), category);
        recorder
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let store = StateManager::new();
        let global = recorder(&store, Category::Global);
        assert!(!store.update_state(&StatePatch::new(), "test"));
        assert!(global.calls.borrow().is_empty());
    }

    #[test]
    fn test_app_state_observer_sees_old_and_new() {
        let store = StateManager::new();
        let observer = recorder(&store, Category::AppState);

        assert!(store.update_state(&StatePatch::new().with_running(true), "test"));

        let calls = observer.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.is_running());
        assert!(!calls[0].1.is_running());
    }

    #[test]
    fn test_unchanged_values_do_not_notify_or_record() {
        let store = StateManager::new();
        store.update_state(&StatePatch::new().with_debug(true), "enable debug");
        let global = recorder(&store, Category::Global);
        let before = store.history_len();

        let current = store.get_state().current_theme;
        assert!(!store.update_state(&StatePatch::new().with_current_theme(current).with_running(false), "noop"));
        assert_eq!(store.history_len(), before);
        assert!(global.calls.borrow().is_empty());
    }

    #[test]
    fn test_inactive_theme_config_only_notifies_global_and_theme_configs() {
        let store = StateManager::new();
        let global = recorder(&store, Category::Global);
        let configs = recorder(&store, Category::ThemeConfigs);
        let theme = recorder(&store, Category::Theme);
        let audio = recorder(&store, Category::Audio);

        assert_eq!(store.get_state().current_theme, "snow");
        assert!(store.set_theme_param("speed", 4.0, Some("rain")));

        assert_eq!(global.calls.borrow().len(), 1);
        assert_eq!(configs.calls.borrow().len(), 1);
        assert!(theme.calls.borrow().is_empty());
        assert!(audio.calls.borrow().is_empty());
    }

    #[test]
    fn test_current_theme_change_notifies_theme() {
        let store = StateManager::new();
        let theme = recorder(&store, Category::Theme);
        let app = recorder(&store, Category::AppState);

        assert!(store.update_state(&StatePatch::new().with_current_theme("rain"), "test"));
        assert_eq!(theme.calls.borrow().len(), 1);
        assert!(app.calls.borrow().is_empty());
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        struct Tagged(&'static str, Rc<RefCell<Vec<&'static str>>>);
        impl StateObserver for Tagged {
            fn on_state_change(&self, _: &AppState, _: &AppState) -> anyhow::Result<()> {
                self.1.borrow_mut().push(self.0);
                Ok(())
            }
        }

        let store = StateManager::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        store.subscribe(Rc::new(Tagged("audio", log.clone())), Category::Audio);
        store.subscribe(Rc::new(Tagged("first", log.clone())), Category::Global);
        store.subscribe(Rc::new(Tagged("second", log.clone())), Category::Global);

        let patch: StatePatch = serde_json::from_value(json!({"audioConfig": {"enabled": true}})).unwrap();
        store.update_state(&patch, "test");
        assert_eq!(*log.borrow(), vec!["first", "second", "audio"]);
    }

    #[test]
    fn test_faulty_observers_do_not_block_others() {
        let store = StateManager::new();
        store.update_state(&StatePatch::new().with_debug(true), "debug");
        store.subscribe(Rc::new(Failing), Category::Global);
        store.subscribe(Rc::new(Panicking), Category::Global);
        let after = recorder(&store, Category::Global);

        assert!(store.update_state(&StatePatch::new().with_fullscreen(true), "test"));
        assert_eq!(after.calls.borrow().len(), 1);
        assert_eq!(store.get_state_section("isFullscreen"), Some(json!(true)));
    }

    #[test]
    fn test_subscription_token_and_unsubscribe() {
        let store = StateManager::new();
        let observer = Rc::new(Recorder::default());
        let handle: ObserverHandle = observer.clone();

        let token = store.subscribe(handle.clone(), Category::AppState);
        store.subscribe(handle.clone(), Category::Audio);
        assert_eq!(store.observer_count(Category::AppState), 1);

        token.unsubscribe();
        assert_eq!(store.observer_count(Category::AppState), 0);

        store.unsubscribe(&handle, Category::Audio);
        store.unsubscribe(&handle, Category::Audio);
        assert_eq!(store.observer_count(Category::Audio), 0);

        store.update_state(&StatePatch::new().with_running(true), "test");
        assert!(observer.calls.borrow().is_empty());
    }

    #[test]
    fn test_subscribe_named_rejects_unknown_category() {
        let store = StateManager::new();
        let result = store.subscribe_named(Rc::new(Recorder::default()), "visuals");
        assert_eq!(result.unwrap_err(), StateError::UnknownCategory("visuals".to_string()));
        assert!(store.subscribe_named(Rc::new(Recorder::default()), "themeConfigs").is_ok());
    }

    #[test]
    fn test_returned_state_is_independent() {
        let store = StateManager::new();
        let mut copy = store.get_state();
        copy.runtime_flags.is_running = true;
        copy.theme_configs.clear();

        let mut section = store.get_state_section("themeConfigs").unwrap();
        section["snow"] = json!(null);

        let fresh = store.get_state();
        assert!(!fresh.is_running());
        assert_eq!(fresh.theme_configs["snow"], AppState::default().theme_configs["snow"]);
    }

    #[test]
    fn test_set_theme_param_on_unregistered_theme_fails() {
        let store = StateManager::new();
        assert!(!store.set_theme_param("speed", 2.0, Some("aurora")));
        assert!(store.set_theme_param("speed", 2.0, None));
        assert_eq!(store.get_current_theme_config()["speed"], json!(2.0));
    }

    #[test]
    fn test_history_only_while_debugging() {
        let store = StateManager::new();
        store.update_state(&StatePatch::new().with_running(true), "quiet");
        assert_eq!(store.history_len(), 0);

        store.update_state(&StatePatch::new().with_debug(true), "enable");
        store.update_state(&StatePatch::new().with_running(false), "loud");
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].source, "loud");
        assert!(history[1].since_previous.is_some());
        assert!(history[1].diff.iter().any(|e| e.path == "isRunning"));
    }

    #[test]
    fn test_history_is_capped_fifo() {
        let store = StateManager::new();
        store.update_state(&StatePatch::new().with_debug(true), "enable");
        store.clear_history();

        for i in 0..150u64 {
            let patch = StatePatch::new().with_theme_param("snow", "count", i + 1000);
            assert!(store.update_state(&patch, &format!("update-{}", i)));
        }

        let history = store.history();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].source, "update-50");
        assert_eq!(history[99].source, "update-149");
    }

    #[test]
    fn test_update_state_json() {
        let store = StateManager::new();
        assert_eq!(store.update_state_json(json!({"isTransitioning": true}), "json"), Ok(true));
        assert!(matches!(
            store.update_state_json(json!({"bogus": 1}), "json"),
            Err(StateError::InvalidPatch(_))
        ));
    }

    #[test]
    fn test_observer_may_update_reentrantly() {
        struct Chained(Weak<StateManager>);
        impl StateObserver for Chained {
            fn on_state_change(&self, new_state: &AppState, _: &AppState) -> anyhow::Result<()> {
                if new_state.is_running() && !new_state.runtime_flags.is_transitioning {
                    if let Some(store) = self.0.upgrade() {
                        store.update_state(&StatePatch::new().with_transitioning(true), "chained");
                    }
                }
                Ok(())
            }
        }

        let store = StateManager::new();
        store.subscribe(Rc::new(Chained(Rc::downgrade(&store))), Category::AppState);
        store.update_state(&StatePatch::new().with_running(true), "test");
        assert!(store.get_state().runtime_flags.is_transitioning);
    }

    #[test]
    fn test_debug_report_mentions_history() {
        let store = StateManager::new();
        store.update_state(&StatePatch::new().with_debug(true), "enable");
        let report = store.debug_report();
        assert!(report.contains("history: 1 record(s)"));
        assert!(report.contains("observers[global] = 0"));
    }

    #[test]
    fn test_equal_number_of_other_repr_is_not_a_change() {
        let store = StateManager::new();
        store.update_state(&StatePatch::new().with_debug(true), "enable");
        let theme = recorder(&store, Category::Theme);
        let before = store.history_len();

        assert_eq!(store.get_state_section("themeConfigs.snow.count"), Some(json!(150)));
        assert!(!store.set_theme_param("count", 150.0, None));
        assert!(!store.update_state_json(json!({"themeConfigs": {"snow": {"wind": 0}}}), "test").unwrap());

        assert_eq!(store.history_len(), before);
        assert!(theme.calls.borrow().is_empty());
        assert_eq!(store.get_state_section("themeConfigs.snow.count"), Some(json!(150)));
    }

    #[test]
    fn test_register_empty_theme_config() {
        let store = StateManager::new();
        let configs = recorder(&store, Category::ThemeConfigs);

        assert!(store.register_theme_config("aurora", ThemeConfig::new()));
        assert_eq!(store.theme_config("aurora"), Some(ThemeConfig::new()));
        assert_eq!(configs.calls.borrow().len(), 1);
        assert!(!store.register_theme_config("aurora", ThemeConfig::new()));

        assert!(store.set_theme_param("hue", 140, Some("aurora")));
        assert_eq!(store.get_state_section("themeConfigs.aurora.hue"), Some(json!(140)));
    }

    #[test]
    fn test_current_theme_without_config_is_ignored() {
        let store = StateManager::new();
        let theme = recorder(&store, Category::Theme);

        assert!(!store.update_state(&StatePatch::new().with_current_theme("nope"), "test"));
        assert_eq!(store.get_state().current_theme, "snow");
        assert!(!store.get_current_theme_config().is_empty());
        assert!(theme.calls.borrow().is_empty());
    }

    #[test]
    fn test_each_token_undoes_one_subscription() {
        let store = StateManager::new();
        let observer = Rc::new(Recorder::default());
        let first = store.subscribe(observer.clone(), Category::AppState);
        let _second = store.subscribe(observer.clone(), Category::AppState);
        assert_eq!(store.observer_count(Category::AppState), 2);

        first.unsubscribe();
        assert_eq!(store.observer_count(Category::AppState), 1);

        store.update_state(&StatePatch::new().with_running(true), "test");
        assert_eq!(observer.calls.borrow().len(), 1);
    }
}
