//! Toura: a chat-style travel assistant. A single session task owns the
//! transcript and talks to a natural-language dialogue service; a window or
//! console front end renders what the session reports.

pub mod backend;
pub mod common;
pub mod config;
pub mod console;
pub mod session;
pub mod ui;
