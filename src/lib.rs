//! Merge Drop (workspace facade crate).
//!
//! Re-exports the game crates under `merge_drop::{types,core,engine,input,term,adapter}`
//! and holds the application glue shared by the binary and the integration tests:
//! environment configuration, file persistence, logging setup, and headless play.

pub use merge_drop_adapter as adapter;
pub use merge_drop_core as core;
pub use merge_drop_engine as engine;
pub use merge_drop_input as input;
pub use merge_drop_term as term;
pub use merge_drop_types as types;

pub mod config;
pub mod headless;
pub mod logging;
pub mod store;
pub mod submit;
