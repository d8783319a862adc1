//! UI panel rendering subsystem
//!
//! - Sidebar (theme selector, playback, theme parameters, debug)
//! - Audio panel (audio settings and visualizer, a state observer)
//! - Panel manager (panel orchestration and layout)

pub mod sidebar;
pub mod audio_panel;
pub mod panel_manager;
