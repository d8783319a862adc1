pub mod traits;
pub mod category;
pub mod state;
pub mod patch;
pub mod history;
pub mod state_manager;
pub mod theme;
pub mod particles;
pub mod color;
pub mod scheduler;
pub mod audio;
pub mod config;
pub mod logging;

// Export traits
pub use traits::{StateObserver, Theme, ThemeLifecycle, Canvas, Bounds};

// Export state store
pub use category::{Category, CategorySet};
pub use state::{AppState, AudioConfig, RuntimeFlags, ThemeConfig};
pub use patch::{StatePatch, AudioConfigPatch};
pub use history::{ChangeRecord, ChangeHistory, DiffEntry, DiffKind, HISTORY_CAPACITY};
pub use state_manager::{StateManager, StateError, Subscription, ObserverHandle};

// Export theme support
pub use theme::ThemeManager;
pub use particles::{ParticleTheme, ParticleShape, ParticleSettings, Particle};
pub use color::{hex_to_color32, parse_hex, color32_to_hex, hsl_to_color32, adjust_brightness, with_alpha};

// Export frame driving and audio
pub use scheduler::{AnimationLoop, Cadence};
pub use audio::{AudioSource, AudioConfigBridge, VolumeTrigger, SimulatedAudio};

pub use config::LaunchOptions;
