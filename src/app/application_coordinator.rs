//! Application-level coordination.
//!
//! Turns panel interactions into store updates. All state changes made by the
//! UI pass through here, labelled with where they came from.

use hushfall::StatePatch;
use tracing::{debug, info};

use crate::app::AppContext;
use crate::ui::panel_manager::PanelInteraction;
use crate::ui::sidebar::SidebarInteraction;

/// Coordinates application-level operations and workflows.
pub struct ApplicationCoordinator;

impl ApplicationCoordinator {
    pub fn handle(app: &mut AppContext, interaction: PanelInteraction) {
        match interaction {
            PanelInteraction::Sidebar(interaction) => Self::handle_sidebar(app, interaction),
            PanelInteraction::AudioEdited(patch) => {
                app.store.update_state(&StatePatch::new().with_audio(patch), "sidebar.audio");
            }
        }
    }

    fn handle_sidebar(app: &mut AppContext, interaction: SidebarInteraction) {
        match interaction {
            SidebarInteraction::ThemeSelected(id) => {
                Self::with_transition(app, |app| {
                    app.themes.activate_theme(&id, true);
                });
            }
            SidebarInteraction::ParamChanged { param, value } => {
                app.store.set_theme_param(&param, value, None);
            }
            SidebarInteraction::ToggleRunning => Self::toggle_running(app),
            SidebarInteraction::ToggleFullscreen => Self::toggle_fullscreen(app),
            SidebarInteraction::DebugToggled(debug) => {
                app.store.update_state(&StatePatch::new().with_debug(debug), "sidebar.debug");
            }
            SidebarInteraction::DumpDebugReport => {
                debug!("{}", app.store.debug_report());
                info!(records = app.store.history_len(), "debug report written to log");
            }
        }
    }

    /// Flips `isRunning`; the theme manager reacts through its subscription.
    pub fn toggle_running(app: &mut AppContext) {
        let running = app.store.get_state().is_running();
        app.store.update_state(&StatePatch::new().with_running(!running), "toggleRunning");
        if running {
            app.animation.pause();
        } else {
            app.animation.resume();
        }
    }

    pub fn toggle_fullscreen(app: &mut AppContext) {
        let fullscreen = app.store.get_state().runtime_flags.is_fullscreen;
        app.store.update_state(&StatePatch::new().with_fullscreen(!fullscreen), "toggleFullscreen");
    }

    /// Marks the state as transitioning for the duration of `f`.
    fn with_transition(app: &mut AppContext, f: impl FnOnce(&mut AppContext)) {
        app.store.update_state(&StatePatch::new().with_transitioning(true), "transition.begin");
        f(app);
        app.store.update_state(&StatePatch::new().with_transitioning(false), "transition.end");
    }
}
