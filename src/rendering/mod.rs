//! Rendering adapters between the hushfall core and egui
//!
//! - Painter canvas (the `Canvas` themes draw on)
//! - Audio visualizer (volume history bars)

pub mod painter_canvas;
pub mod visualizer;
