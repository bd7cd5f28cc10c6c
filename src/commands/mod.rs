//! Request-handling boundary.
//!
//! Each command takes the shared [`crate::AppState`] and returns
//! `Result<T, String>` with errors rendered for display.

pub mod chat;
pub mod goals;
pub mod settings;
