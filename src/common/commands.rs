/// Commands the UI sends down to the session runner.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Text typed in the input bar and confirmed with Send/Enter.
    Submit(String),
    /// Drop the transcript and start over from the greeting.
    Reset,
    Shutdown,
}
