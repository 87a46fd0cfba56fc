//! Core process state shared across the codebase.

mod state;

pub use state::{defer_interrupts, is_shutdown, register_server, setup_shutdown_handler};
