mod app;
mod components;
pub mod state;
pub mod style;

pub use app::ChatApp;
pub use style::ChatStyle;
