//! `Canvas` implementation over an egui painter.
//!
//! Themes draw in a local coordinate space starting at (0, 0); this adapter
//! offsets everything by the painted rect's origin.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke};
use hushfall::{Bounds, Canvas};

pub struct PainterCanvas<'a> {
    painter: &'a egui::Painter,
    rect: Rect,
}

impl<'a> PainterCanvas<'a> {
    pub fn new(painter: &'a egui::Painter, rect: Rect) -> Self {
        Self { painter, rect }
    }

    fn to_screen(&self, pos: Pos2) -> Pos2 {
        pos + self.rect.min.to_vec2()
    }
}

impl Canvas for PainterCanvas<'_> {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.rect.width(), self.rect.height())
    }

    fn clear(&mut self, color: Color32) {
        self.painter.rect_filled(self.rect, 0.0, color);
    }

    fn fill_circle(&mut self, center: Pos2, radius: f32, color: Color32) {
        self.painter.circle_filled(self.to_screen(center), radius, color);
    }

    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32) {
        self.painter
            .line_segment([self.to_screen(from), self.to_screen(to)], Stroke::new(width, color));
    }
}
