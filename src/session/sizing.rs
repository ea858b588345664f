//! Bubble and input-bar measurement.
//!
//! The window surface paints exactly the lines returned by
//! [`SizingOracle::layout`], cell by cell, so the height reported for a row is
//! the height that ends up on screen.

use std::borrow::Cow;

use textwrap::core::display_width;
use textwrap::{Options, WordSplitter};

/// Advance of one monospace cell relative to the font size.
const MONOSPACE_ADVANCE: f32 = 0.6;
/// Line pitch relative to the font size.
const LINE_SPACING: f32 = 1.3;

fn cell_width(font_size: f32) -> f32 {
    font_size * MONOSPACE_ADVANCE
}

fn line_pitch(font_size: f32) -> f32 {
    (font_size * LINE_SPACING).round()
}

/// Text metrics used for wrapping bubbles. Glyph advance and line height are
/// derived from the monospace font size the bubble is painted with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleMetrics {
    pub font_size: f32,
    /// Inner padding of the bubble on every side.
    pub inset: f32,
    pub min_height: f32,
    /// Share of the row width a bubble may occupy.
    pub max_width_ratio: f32,
    /// Vertical gap added to every row.
    pub row_padding: f32,
}

impl BubbleMetrics {
    /// Width of one display cell.
    pub fn glyph_width(&self) -> f32 {
        cell_width(self.font_size)
    }

    pub fn line_height(&self) -> f32 {
        line_pitch(self.font_size)
    }
}

impl Default for BubbleMetrics {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            inset: 7.0,
            min_height: 30.0,
            max_width_ratio: 0.75,
            row_padding: 10.0,
        }
    }
}

/// Limits for the auto-growing input bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputMetrics {
    pub font_size: f32,
    pub inset: f32,
    pub max_height: f32,
}

impl InputMetrics {
    pub fn glyph_width(&self) -> f32 {
        cell_width(self.font_size)
    }

    pub fn line_height(&self) -> f32 {
        line_pitch(self.font_size)
    }
}

impl Default for InputMetrics {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            inset: 2.0,
            max_height: 160.0,
        }
    }
}

/// Wrapped text plus the outer size of the bubble that holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleLayout {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// A bubble placed in a table row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub bubble: BubbleLayout,
    /// Bubble height plus row padding.
    pub height: f32,
}

pub trait SizingOracle {
    fn layout(&self, content: &str, max_width: f32) -> BubbleLayout;

    fn measure(&self, content: &str, max_width: f32) -> f32 {
        self.layout(content, max_width).height
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextMetricsOracle {
    pub bubble: BubbleMetrics,
    pub input: InputMetrics,
}

impl TextMetricsOracle {
    pub fn new(bubble: BubbleMetrics, input: InputMetrics) -> Self {
        Self { bubble, input }
    }

    /// Widest bubble allowed in a row of `row_width`.
    pub fn bubble_max_width(&self, row_width: f32) -> f32 {
        row_width * self.bubble.max_width_ratio
    }

    /// Bubble layout and row height for `content` in a row of `row_width`.
    pub fn row_layout(&self, content: &str, row_width: f32) -> RowLayout {
        let bubble = self.layout(content, self.bubble_max_width(row_width));
        let height = bubble.height + self.bubble.row_padding;
        RowLayout { bubble, height }
    }

    pub fn row_height(&self, content: &str, row_width: f32) -> f32 {
        self.row_layout(content, row_width).height
    }

    /// Height the input bar grows to for `text`, capped at the maximum.
    pub fn input_height(&self, text: &str, width: f32) -> f32 {
        let metrics = &self.input;
        let columns = columns_for(width - 2.0 * metrics.inset, metrics.glyph_width());
        let lines = wrap(text, columns).len().max(1);
        let height = lines as f32 * metrics.line_height() + 2.0 * metrics.inset;
        height.min(metrics.max_height)
    }
}

impl SizingOracle for TextMetricsOracle {
    fn layout(&self, content: &str, max_width: f32) -> BubbleLayout {
        let metrics = &self.bubble;
        let columns = columns_for(max_width - 2.0 * metrics.inset, metrics.glyph_width());
        let lines = wrap(content, columns);

        let widest = lines.iter().map(|line| display_width(line)).max().unwrap_or(0);
        let text_height = lines.len().max(1) as f32 * metrics.line_height();
        let height = (text_height + 2.0 * metrics.inset).max(metrics.min_height);
        let width = (widest as f32 * metrics.glyph_width() + 2.0 * metrics.inset)
            .min(max_width.max(0.0));

        BubbleLayout {
            lines,
            width,
            height,
        }
    }
}

/// Splits a wrapped line into paintable glyphs, each with the display cell it
/// starts at. Zero-width characters stay with the glyph before them.
pub fn glyph_cells(line: &str) -> Vec<(usize, &str)> {
    let mut cells = Vec::new();
    let mut column = 0;
    let mut open: Option<(usize, usize)> = None;

    for (offset, ch) in line.char_indices() {
        let width = display_width(&line[offset..offset + ch.len_utf8()]);
        if width == 0 && open.is_some() {
            continue;
        }
        if let Some((start, start_column)) = open.take() {
            cells.push((start_column, &line[start..offset]));
        }
        open = Some((offset, column));
        column += width;
    }
    if let Some((start, start_column)) = open {
        cells.push((start_column, &line[start..]));
    }

    cells
}

fn columns_for(text_width: f32, glyph_width: f32) -> usize {
    if glyph_width <= 0.0 || !text_width.is_finite() {
        return usize::MAX;
    }
    ((text_width / glyph_width).floor() as usize).max(1)
}

/// Wraps on `columns` display cells. Hard newlines are kept and words longer
/// than a line are split.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let options = Options::new(columns).word_splitter(WordSplitter::NoHyphenation);
    textwrap::wrap(text, options)
        .into_iter()
        .map(Cow::into_owned)
        .collect()
}
