//! Queries over the captured service output.
//!
//! [`query`] evaluates tail, level, and pattern filters over the log file;
//! [`render`] prints the outcome for operators.

mod query;
mod render;

pub(crate) const LOGS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::logs");

pub use query::{LogQuery, LogQueryEngine, LogQueryError};
pub(crate) use render::render_outcome;
