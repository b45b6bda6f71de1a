//! Terminal input module (engine-facing).
//!
//! This module is independent of any UI framework. It maps `crossterm` key
//! events into [`crate::types::GameAction`] values, either directly (digit keys,
//! pause, restart) or through a column cursor moved with the arrow keys.

pub mod handler;
pub mod map;

pub use merge_drop_types as types;

pub use handler::InputHandler;
pub use map::{handle_key_event, should_quit, KeyIntent};
