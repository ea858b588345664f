use super::types::Message;

/// Events the session runner pushes up to the UI.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Full transcript snapshot; the surface re-renders and scrolls to the last row.
    Refresh(Vec<Message>),
    /// Whether a reply is outstanding, so the surface can disable Send.
    Busy(bool),
    /// Transient notice (rejected submit, backend failure, timeout).
    Notice(String),
}
