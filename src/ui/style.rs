use eframe::egui::Color32;

/// Colors and bubble shape for the chat window, passed in at construction.
/// Font size lives in the sizing metrics so measured and painted text agree.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatStyle {
    pub opponent_bubble: Color32,
    pub opponent_text: Color32,
    pub user_bubble: Color32,
    pub user_text: Color32,
    pub background: Color32,
    pub corner_radius: u8,
    pub border_width: f32,
}

impl Default for ChatStyle {
    fn default() -> Self {
        Self {
            opponent_bubble: color_from_hex("579FF3"),
            opponent_text: Color32::WHITE,
            user_bubble: color_from_hex("FFFFFF"),
            user_text: color_from_hex("4E5974"),
            background: color_from_hex("F0F3F5"),
            corner_radius: 15,
            border_width: 2.0,
        }
    }
}

/// Parses `RRGGBB` with an optional leading `#`. Anything else is gray.
pub fn color_from_hex(hex: &str) -> Color32 {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Color32::GRAY;
    }

    match u32::from_str_radix(digits, 16) {
        Ok(rgb) => Color32::from_rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8),
        Err(_) => Color32::GRAY,
    }
}
