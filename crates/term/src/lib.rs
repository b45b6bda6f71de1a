//! Terminal game renderer.
//!
//! A small, game-oriented rendering layer: the engine snapshot is drawn into a
//! plain framebuffer, and only changed cells are flushed to the terminal.
//! No widget or layout library is involved.
//!
//! - [`GameView`] is pure and maps a [`GameSnapshot`](engine::GameSnapshot) to cells
//! - [`TerminalRenderer`] owns raw mode and the alternate screen
//! - [`RenderThrottle`] skips frames while nothing moves

pub mod fb;
pub mod game_view;
pub mod renderer;
pub mod throttle;

pub use merge_drop_engine as engine;
pub use merge_drop_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use game_view::{tile_color, tile_label, AdapterStatusView, AnchorY, GameView, Hud, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
pub use throttle::{is_static, RenderThrottle};
