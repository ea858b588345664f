use eframe::egui;

use crate::common::Sender;
use crate::session::sizing::{BubbleLayout, TextMetricsOracle, glyph_cells};
use crate::ui::state::AppState;
use crate::ui::style::ChatStyle;

const SIDE_PADDING: f32 = 5.0;

/// Draws the transcript. Every row is allocated from [`AppState::row_layout`]
/// and the bubble paints that layout's own line breaks.
pub fn render(
    ui: &mut egui::Ui,
    state: &mut AppState,
    oracle: &TextMetricsOracle,
    style: &ChatStyle,
) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let row_width = ui.available_width();
            let count = state.messages.len();

            for index in 0..count {
                let row_layout = match state.row_layout(index, row_width, oracle) {
                    Ok(row_layout) => row_layout,
                    Err(err) => {
                        log::warn!("Skipping transcript row: {err}");
                        continue;
                    }
                };
                let (row, _) = ui.allocate_exact_size(
                    egui::vec2(row_width, row_layout.height),
                    egui::Sense::hover(),
                );

                let sender = state.messages[index].sender();
                let bubble = &row_layout.bubble;
                let left = match sender {
                    Sender::Opponent => row.left() + SIDE_PADDING,
                    Sender::User => row.right() - SIDE_PADDING - bubble.width,
                };
                let rect = egui::Rect::from_min_size(
                    egui::pos2(left, row.top()),
                    egui::vec2(bubble.width, bubble.height),
                );
                paint_bubble(ui, rect, bubble, sender, oracle, style);

                if state.scroll_to_bottom && index + 1 == count {
                    ui.scroll_to_rect(row, Some(egui::Align::BOTTOM));
                    state.scroll_to_bottom = false;
                }
            }
        });
}

fn paint_bubble(
    ui: &egui::Ui,
    rect: egui::Rect,
    layout: &BubbleLayout,
    sender: Sender,
    oracle: &TextMetricsOracle,
    style: &ChatStyle,
) {
    let (fill, text_color) = match sender {
        Sender::Opponent => (style.opponent_bubble, style.opponent_text),
        Sender::User => (style.user_bubble, style.user_text),
    };
    let radius = egui::CornerRadius::same(style.corner_radius);
    let painter = ui.painter();

    painter.rect_filled(rect, radius, fill);
    painter.rect_stroke(
        rect,
        radius,
        egui::Stroke::new(style.border_width, fill),
        egui::StrokeKind::Inside,
    );

    // Glyphs go on the oracle's cell grid, so wide characters take the two
    // cells they were measured with.
    let metrics = &oracle.bubble;
    let font = egui::FontId::monospace(metrics.font_size);
    for (row, line) in layout.lines.iter().enumerate() {
        let top = rect.top() + metrics.inset + row as f32 * metrics.line_height();
        for (column, glyph) in glyph_cells(line) {
            if glyph.trim().is_empty() {
                continue;
            }
            let pos = egui::pos2(
                rect.left() + metrics.inset + column as f32 * metrics.glyph_width(),
                top,
            );
            painter.text(pos, egui::Align2::LEFT_TOP, glyph, font.clone(), text_color);
        }
    }
}
