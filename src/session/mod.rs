pub mod controller;
pub mod link;
pub mod runner;
pub mod sizing;
pub mod store;
pub mod surface;

pub use controller::{AcceptAll, ChatSessionController, SessionError, SessionSettings};
pub use runner::{Collaborators, SessionRunner};
pub use sizing::TextMetricsOracle;
pub use surface::ChannelSurface;
