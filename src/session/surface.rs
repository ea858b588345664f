use tokio::sync::mpsc;

use crate::common::{Message, SessionEvent};

/// What the controller needs from whatever draws the transcript.
pub trait RenderSurface: Send {
    /// Re-render every row from `snapshot`, then scroll so the last row is
    /// fully visible. Must tolerate an empty snapshot.
    fn reload_and_scroll_to_bottom(&mut self, snapshot: &[Message]);

    fn set_busy(&mut self, _busy: bool) {}

    fn notice(&mut self, _text: &str) {}
}

/// Forwards render requests to a UI running on another thread.
pub struct ChannelSurface {
    event_sender: mpsc::Sender<SessionEvent>,
}

impl ChannelSurface {
    pub fn new(event_sender: mpsc::Sender<SessionEvent>) -> Self {
        Self { event_sender }
    }

    fn send(&self, event: SessionEvent) {
        if let Err(err) = self.event_sender.try_send(event) {
            log::warn!("Failed to notify UI: {err}");
        }
    }
}

impl RenderSurface for ChannelSurface {
    fn reload_and_scroll_to_bottom(&mut self, snapshot: &[Message]) {
        self.send(SessionEvent::Refresh(snapshot.to_vec()));
    }

    fn set_busy(&mut self, busy: bool) {
        self.send(SessionEvent::Busy(busy));
    }

    fn notice(&mut self, text: &str) {
        self.send(SessionEvent::Notice(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_snapshots_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut surface = ChannelSurface::new(tx);

        surface.reload_and_scroll_to_bottom(&[]);
        surface.set_busy(true);
        surface.reload_and_scroll_to_bottom(&[Message::opponent("Hi")]);

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Refresh(rows)) if rows.is_empty()));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Busy(true))));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Refresh(rows)) if rows.len() == 1));
    }

    #[test]
    fn full_channel_drops_event_without_panicking() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut surface = ChannelSurface::new(tx);

        surface.notice("first");
        surface.notice("second");

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Notice(text)) if text == "first"));
        assert!(rx.try_recv().is_err());
    }
}
