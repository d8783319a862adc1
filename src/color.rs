//! Color helpers shared by the themes and the sidebar.
//!
//! Theme configs carry colors as hex strings (`"#aaddff"`), so most of this
//! module is about getting from that representation to `Color32` and back.

use egui::Color32;

/// Converts a hex color string (like "#aaddff" or "#adf") to Color32.
///
/// Returns `None` when the string is not a 3 or 6 digit hex color.
pub fn parse_hex(hex: &str) -> Option<Color32> {
    let hex = hex.trim().trim_start_matches('#');

    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color32::from_rgb(r, g, b))
        }
        3 => {
            // Short form: each digit is doubled ("#adf" == "#aaddff")
            let mut channels = [0u8; 3];
            for (slot, ch) in channels.iter_mut().zip(hex.chars()) {
                let digit = ch.to_digit(16)? as u8;
                *slot = digit * 17;
            }
            Some(Color32::from_rgb(channels[0], channels[1], channels[2]))
        }
        _ => None,
    }
}

/// Converts a hex color string to Color32, falling back to white.
pub fn hex_to_color32(hex: &str) -> Color32 {
    parse_hex(hex).unwrap_or(Color32::WHITE)
}

/// Formats a color as a lowercase `#rrggbb` string (alpha is dropped).
pub fn color32_to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

/// Converts HSL (hue in degrees, saturation and lightness in 0..=1) to Color32.
pub fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let m = l - chroma / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Color32::from_rgb(to_u8(r), to_u8(g), to_u8(b))
}

/// Adjusts the brightness of a color by a factor (1.0 = no change, >1.0 = brighter, <1.0 = darker)
pub fn adjust_brightness(color: Color32, factor: f32) -> Color32 {
    let r = (color.r() as f32 * factor).min(255.0) as u8;
    let g = (color.g() as f32 * factor).min(255.0) as u8;
    let b = (color.b() as f32 * factor).min(255.0) as u8;
    Color32::from_rgb(r, g, b)
}

/// Sets the alpha channel of a color
pub fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}
