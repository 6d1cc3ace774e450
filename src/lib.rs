//! Quickterm - a drop-down scratchpad terminal for i3 and Sway
//!
//! The terminal is found through a window manager mark. Toggling hides it in the
//! scratchpad when it is on the focused workspace and pops it over the focused
//! workspace otherwise. When no marked terminal exists a new one is spawned,
//! running quickterm in in-place mode to mark and place its own window.

pub mod config;
pub mod core;
pub mod ipc;
pub mod terminal;

// Re-export commonly used types
pub use config::{Config, ConfigError, Position};
pub use crate::core::quickterm::Quickterm;
pub use ipc::{SwayClient, WindowManager};
