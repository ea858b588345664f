use eframe::egui;

use crate::session::sizing::TextMetricsOracle;
use crate::ui::state::AppState;

const SEND_BUTTON_WIDTH: f32 = 60.0;

/// Growing text box plus Send. Returns the text to submit, if any.
pub fn render(ui: &mut egui::Ui, state: &mut AppState, oracle: &TextMetricsOracle) -> Option<String> {
    let mut send = false;
    ui.horizontal(|ui| {
        let width = (ui.available_width() - SEND_BUTTON_WIDTH).max(SEND_BUTTON_WIDTH);
        let height = oracle.input_height(&state.input_text, width);

        // Drawn with the same monospace font and inset the height is computed from.
        let metrics = &oracle.input;
        let response = ui.add_sized(
            [width, height],
            egui::TextEdit::multiline(&mut state.input_text)
                .font(egui::FontId::monospace(metrics.font_size))
                .margin(egui::Margin::same(metrics.inset as i8))
                .hint_text("Ask Toura"),
        );

        let can_send = state.can_send();
        if ui
            .add_enabled(can_send, egui::Button::new("Send"))
            .clicked()
        {
            send = true;
        }

        // Ctrl/Cmd+Enter sends; plain Enter inserts a newline.
        if can_send
            && response.has_focus()
            && ui.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter))
        {
            send = true;
        }
    });

    if send && state.can_send() {
        let message = state.input_text.trim().to_string();
        state.input_text.clear();
        return Some(message);
    }

    None
}
