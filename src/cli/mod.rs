//! Command-line interface for kb-retriever
//!
//! Argument parsing and human-readable rendering of hits and answers.

pub mod args;
pub mod render;

pub use args::{Args, Commands};
pub use render::{render_answer, render_hits};
