//! Launch options shared by the GUI and the simulator.
//!
//! Options come from the command line (parsed by hand, like the rest of our
//! tools) with `HUSHFALL_DEBUG` as an environment fallback for `--debug`.

use anyhow::{bail, Context, Result};

use crate::patch::StatePatch;
use crate::state::AppState;

pub const DEBUG_ENV: &str = "HUSHFALL_DEBUG";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaunchOptions {
    pub debug: bool,
    pub theme: Option<String>,
    pub fullscreen: bool,
    /// Start with the animation paused.
    pub paused: bool,
    /// Seed for particle and simulated-audio randomness.
    pub seed: Option<u64>,
    /// Frames to simulate (simulator only).
    pub frames: Option<u64>,
    /// Enable the simulated audio source.
    pub audio: bool,
    pub help: bool,
}

impl LaunchOptions {
    /// Parses arguments (without the program name).
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut options = LaunchOptions::default();
        let mut i = 0;

        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => options.help = true,
                "--debug" => options.debug = true,
                "--fullscreen" => options.fullscreen = true,
                "--paused" => options.paused = true,
                "--audio" => options.audio = true,
                "--theme" => {
                    i += 1;
                    let Some(theme) = args.get(i) else {
                        bail!("--theme requires an argument");
                    };
                    options.theme = Some(theme.clone());
                }
                "--seed" => {
                    i += 1;
                    let Some(seed) = args.get(i) else {
                        bail!("--seed requires an argument");
                    };
                    options.seed = Some(seed.parse().with_context(|| format!("invalid seed '{}'", seed))?);
                }
                "--frames" => {
                    i += 1;
                    let Some(frames) = args.get(i) else {
                        bail!("--frames requires an argument");
                    };
                    options.frames = Some(frames.parse().with_context(|| format!("invalid frame count '{}'", frames))?);
                }
                other => bail!("unknown argument: {}", other),
            }
            i += 1;
        }

        Ok(options)
    }

    /// Parses the process arguments and environment.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::parse(std::env::args().skip(1))?;
        if let Ok(value) = std::env::var(DEBUG_ENV) {
            options.debug |= matches!(value.as_str(), "1" | "true" | "yes");
        }
        Ok(options)
    }

    /// Initial patch applied on top of the default state.
    pub fn initial_patch(&self) -> StatePatch {
        let mut patch = StatePatch::new()
            .with_debug(self.debug)
            .with_fullscreen(self.fullscreen)
            .with_running(!self.paused);
        if let Some(theme) = &self.theme {
            patch = patch.with_current_theme(theme.clone());
        }
        if self.audio {
            patch.audio_config.enabled = Some(true);
        }
        patch
    }

    /// Default state with these options applied.
    pub fn initial_state(&self) -> AppState {
        let mut state = AppState::default();
        self.initial_patch().apply(&mut state);
        state
    }

    pub fn usage(program: &str) -> String {
        format!(
            "Usage: {} [--theme <id>] [--seed <n>] [--debug] [--fullscreen] [--paused] [--audio] [--frames <n>]\n\
             \n\
             Environment:\n  {}=1   same as --debug\n  RUST_LOG     log filter (default: info)",
            program, DEBUG_ENV
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_options() {
        let options = LaunchOptions::parse([
            "--debug", "--theme", "rain", "--seed", "42", "--fullscreen", "--paused", "--frames", "600", "--audio",
        ])
        .unwrap();
        assert!(options.debug && options.fullscreen && options.paused && options.audio);
        assert_eq!(options.theme.as_deref(), Some("rain"));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.frames, Some(600));
    }

    #[test]
    fn test_parse_errors() {
        assert!(LaunchOptions::parse(["--theme"]).is_err());
        assert!(LaunchOptions::parse(["--seed", "abc"]).is_err());
        assert!(LaunchOptions::parse(["--bogus"]).is_err());
    }

    #[test]
    fn test_initial_state() {
        let state = LaunchOptions::parse(["--theme", "rain", "--audio"]).unwrap().initial_state();
        assert_eq!(state.current_theme, "rain");
        assert!(state.is_running());
        assert!(state.audio_config.enabled);
        assert!(!state.debug);

        let paused = LaunchOptions::parse(["--paused"]).unwrap().initial_state();
        assert!(!paused.is_running());
    }
}
