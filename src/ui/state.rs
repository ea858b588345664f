use crate::common::{Message, SessionEvent};
use crate::session::sizing::{RowLayout, TextMetricsOracle};
use crate::session::store::StoreError;

/// Local state of the chat window.
pub struct AppState {
    pub messages: Vec<Message>,
    pub input_text: String,
    pub busy: bool,
    pub notice: Option<String>,
    /// Set by a refresh; cleared once the last row has been scrolled to.
    pub scroll_to_bottom: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input_text: String::new(),
            busy: false,
            notice: None,
            scroll_to_bottom: false,
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Refresh(messages) => {
                self.messages = messages;
                self.scroll_to_bottom = !self.messages.is_empty();
            }
            SessionEvent::Busy(busy) => {
                self.busy = busy;
                if busy {
                    self.notice = None;
                }
            }
            SessionEvent::Notice(text) => self.notice = Some(text),
        }
    }

    pub fn can_send(&self) -> bool {
        !self.busy && !self.input_text.trim().is_empty()
    }

    /// Layout of row `index` in a list `row_width` wide. The transcript is
    /// painted from this, so it is also the row's allocated height.
    pub fn row_layout(
        &self,
        index: usize,
        row_width: f32,
        oracle: &TextMetricsOracle,
    ) -> Result<RowLayout, StoreError> {
        let message = self.messages.get(index).ok_or(StoreError::OutOfRange {
            index,
            count: self.messages.len(),
        })?;
        Ok(oracle.row_layout(&bubble_text(message), row_width))
    }

    /// Height of row `index` in a list `row_width` wide.
    pub fn row_height(
        &self,
        index: usize,
        row_width: f32,
        oracle: &TextMetricsOracle,
    ) -> Result<f32, StoreError> {
        self.row_layout(index, row_width, oracle).map(|row| row.height)
    }
}

/// Text drawn inside a bubble; attachments get a caption line.
pub fn bubble_text(message: &Message) -> String {
    match message.attachment() {
        Some(attachment) => format!(
            "{}\n[image {} KB]",
            message.content(),
            attachment.bytes.len().div_ceil(1024)
        ),
        None => message.content().to_string(),
    }
}
