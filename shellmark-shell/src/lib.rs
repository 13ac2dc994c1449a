//! # Shellmark Shell
//!
//! A small interactive shell built on `shellmark-core`. It keeps the user's
//! prompt hooks, fires the prompt lifecycle events from its read-eval loop,
//! and runs each command line through the system shell.

pub mod config;
pub mod prompt;
pub mod repl;
pub mod util;

pub use config::ShellConfig;
pub use repl::{ExecMode, Outcome, Repl};
