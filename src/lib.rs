//! An interactive shell with a raw-mode line editor and an N-stage pipeline
//! executor.
//!
//! The [`editor`] turns keystrokes into a command line, recalling entries
//! from a bounded [`history`]. [`parser`] splits the line into built-ins or
//! pipeline stages, and [`pipeline`] runs the stages as processes joined by
//! pipes. [`repl::Shell`] ties them together.

pub mod builtins;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod parser;
pub mod pipeline;
pub mod repl;
pub mod terminal;

pub use error::{Result, ShellError};
pub use repl::Shell;
