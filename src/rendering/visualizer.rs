//! Volume history visualizer for the audio panel.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke};
use hushfall::{adjust_brightness, with_alpha};

const VISUALIZER_HEIGHT: f32 = 60.0;

/// Bar height (in points) for a level in 0..=1.
pub fn bar_height(level: f64, height: f32) -> f32 {
    (level.clamp(0.0, 1.0) as f32) * height
}

/// Draws one bar per sample, newest on the right, plus the threshold line.
pub fn render_visualizer(ui: &mut egui::Ui, history: &[f64], threshold: f64, accent: Color32) {
    let size = egui::vec2(ui.available_width(), VISUALIZER_HEIGHT);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;

    painter.rect_filled(rect, 4.0, Color32::from_rgb(20, 24, 36));

    if !history.is_empty() {
        let bar_width = rect.width() / history.len() as f32;
        for (i, level) in history.iter().enumerate() {
            let h = bar_height(*level, rect.height());
            let x = rect.min.x + i as f32 * bar_width;
            let bar = Rect::from_min_max(Pos2::new(x, rect.max.y - h), Pos2::new(x + bar_width.max(1.0), rect.max.y));
            let color = if *level >= threshold { adjust_brightness(accent, 1.4) } else { with_alpha(accent, 160) };
            painter.rect_filled(bar, 0.0, color);
        }
    }

    let y = rect.max.y - bar_height(threshold, rect.height());
    painter.line_segment(
        [Pos2::new(rect.min.x, y), Pos2::new(rect.max.x, y)],
        Stroke::new(1.0, Color32::from_rgb(231, 76, 60)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_height_is_clamped() {
        assert_eq!(bar_height(0.5, 60.0), 30.0);
        assert_eq!(bar_height(2.0, 60.0), 60.0);
        assert_eq!(bar_height(-1.0, 60.0), 0.0);
    }
}
