//! Tail-and-filter queries over the captured service log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::debug;

use super::LOGS_TARGET;

/// Parameters of a log query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Number of trailing physical lines to consider; `0` keeps every line.
    pub tail: usize,
    /// Severity token such as `error` or `warn`.
    pub level: Option<String>,
    /// Regular expression records must match.
    pub pattern: Option<String>,
}

/// A single line of the log, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub line_number: usize,
    pub text: String,
}

/// Outcome of a query that could be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogQueryOutcome {
    /// The log file does not exist yet.
    Missing { path: PathBuf },
    /// The log file exists but holds no lines.
    Empty,
    /// Lines were read but the filters removed all of them.
    NoMatches,
    Records(Vec<LogRecord>),
}

/// Errors raised while evaluating a log query.
#[derive(Debug, Error)]
pub enum LogQueryError {
    #[error("invalid search pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to read log file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Evaluates [`LogQuery`] values against one log file.
#[derive(Debug, Clone)]
pub struct LogQueryEngine {
    path: PathBuf,
}

impl LogQueryEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reads the tail window and applies the level and pattern filters.
    ///
    /// Filters are compiled before the file is opened so that a bad pattern
    /// fails the query without producing partial output.
    pub fn query(&self, query: &LogQuery) -> Result<LogQueryOutcome, LogQueryError> {
        let filters = Filters::compile(query)?;
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(LogQueryOutcome::Missing {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(LogQueryError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let window =
            read_window(BufReader::new(file), query.tail).map_err(|source| LogQueryError::Read {
                path: self.path.clone(),
                source,
            })?;
        if window.is_empty() {
            return Ok(LogQueryOutcome::Empty);
        }
        let considered = window.len();
        let records: Vec<LogRecord> = window
            .into_iter()
            .filter(|record| filters.matches(&record.text))
            .collect();
        debug!(
            target: LOGS_TARGET,
            considered,
            matched = records.len(),
            "log query evaluated"
        );
        if records.is_empty() {
            Ok(LogQueryOutcome::NoMatches)
        } else {
            Ok(LogQueryOutcome::Records(records))
        }
    }
}

#[derive(Debug, Default)]
struct Filters {
    level: Option<Regex>,
    pattern: Option<Regex>,
}

impl Filters {
    fn compile(query: &LogQuery) -> Result<Self, LogQueryError> {
        let level = query
            .level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .map(|level| {
                let token = regex::escape(&level.to_uppercase());
                case_insensitive(&format!(r"\b{token}\b|{token}:"))
            })
            .transpose()?;
        let pattern = query
            .pattern
            .as_deref()
            .map(case_insensitive)
            .transpose()?;
        Ok(Self { level, pattern })
    }

    fn matches(&self, text: &str) -> bool {
        self.level.as_ref().is_none_or(|level| level.is_match(text))
            && self
                .pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(text))
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, LogQueryError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| LogQueryError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })
}

/// Streams `reader`, keeping only the last `tail` lines (all when `tail == 0`).
fn read_window<R: BufRead>(mut reader: R, tail: usize) -> io::Result<VecDeque<LogRecord>> {
    let mut window = VecDeque::with_capacity(tail.min(1024));
    let mut buffer = Vec::new();
    let mut line_number = 0usize;
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(window);
        }
        line_number += 1;
        if tail > 0 && window.len() == tail {
            window.pop_front();
        }
        window.push_back(LogRecord {
            line_number,
            text: decode_line(&buffer),
        });
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let line = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
