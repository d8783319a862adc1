//! Hushfall window
//!
//! Full-screen ambient animations (falling snow, rain) that react to the
//! ambient sound level, with a sidebar for theme and audio settings.
//!
//! The application is built with a modular architecture:
//! - `app/` - Session wiring and interaction coordination
//! - `ui/` - Sidebar, audio panel and panel layout
//! - `rendering/` - egui adapters (painter canvas, visualizer)

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::time::Instant;

use eframe::egui;
use hushfall::{logging, LaunchOptions};

mod app;
mod rendering;
mod ui;

use app::{AppContext, ApplicationCoordinator};
use ui::panel_manager::PanelManager;

/// Main application entry point.
fn main() -> eframe::Result {
    let options = match LaunchOptions::from_env() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            eprintln!("{}", LaunchOptions::usage("hushfall-gui"));
            std::process::exit(2);
        }
    };
    if options.help {
        println!("{}", LaunchOptions::usage("hushfall-gui"));
        return Ok(());
    }

    logging::init_logging(options.debug);
    tracing::info!("Starting Hushfall");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_fullscreen(options.fullscreen)
            .with_title("Hushfall"),
        ..Default::default()
    };

    eframe::run_native(
        "Hushfall",
        native_options,
        Box::new(move |_cc| Ok(Box::new(HushfallApp::new(&options)))),
    )
}

struct HushfallApp {
    context: AppContext,
    /// Fullscreen state last sent to the window.
    applied_fullscreen: bool,
}

impl HushfallApp {
    fn new(options: &LaunchOptions) -> Self {
        let context = AppContext::new(options);
        let applied_fullscreen = context.store.get_state().runtime_flags.is_fullscreen;
        Self {
            context,
            applied_fullscreen,
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (space, f11, escape) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::F11),
                i.key_pressed(egui::Key::Escape),
            )
        });

        if space {
            ApplicationCoordinator::toggle_running(&mut self.context);
        }
        let fullscreen = self.context.store.get_state().runtime_flags.is_fullscreen;
        if f11 || (escape && fullscreen) {
            ApplicationCoordinator::toggle_fullscreen(&mut self.context);
        }
    }

    fn sync_window(&mut self, ctx: &egui::Context) {
        let fullscreen = self.context.store.get_state().runtime_flags.is_fullscreen;
        if fullscreen != self.applied_fullscreen {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
            self.applied_fullscreen = fullscreen;
        }
    }
}

impl eframe::App for HushfallApp {
    /// Per-frame loop: input, audio sampling, panels, then interaction handling.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);
        self.context.pump_audio(Instant::now());

        for interaction in PanelManager::render_all_panels(ctx, &mut self.context) {
            ApplicationCoordinator::handle(&mut self.context, interaction);
        }

        self.sync_window(ctx);

        // Animation is driven by continuous repaints
        ctx.request_repaint();
    }
}
