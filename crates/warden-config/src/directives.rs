//! Textual directives accepted by the configuration layers.
//!
//! Both directive types travel as plain strings through every layer (file,
//! environment, and CLI) so they merge identically regardless of source.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing [`AssetJob`] values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetJobParseError {
    /// The job did not contain exactly three comma-separated fields.
    #[error("asset job '{0}' must have the form 'workdir,input,output'")]
    Shape(String),
    /// One of the fields was blank.
    #[error("asset job '{0}' has an empty field")]
    EmptyField(String),
}

/// One invocation of the static asset compiler.
///
/// Written as `workdir,input,output`; the compiler runs inside `workdir`
/// and receives `input` and `output` relative to it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct AssetJob {
    /// Directory the compiler runs in.
    pub workdir: PathBuf,
    /// Source stylesheet, relative to `workdir`.
    pub input: PathBuf,
    /// Generated artefact, relative to `workdir`.
    pub output: PathBuf,
}

impl AssetJob {
    /// Creates a new asset job.
    #[must_use]
    pub fn new(
        workdir: impl Into<PathBuf>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            input: input.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for AssetJob {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{},{},{}",
            self.workdir.display(),
            self.input.display(),
            self.output.display()
        )
    }
}

impl FromStr for AssetJob {
    type Err = AssetJobParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = input.split(',').map(str::trim).collect();
        let [workdir, source, output] = fields.as_slice() else {
            return Err(AssetJobParseError::Shape(input.to_owned()));
        };
        if workdir.is_empty() || source.is_empty() || output.is_empty() {
            return Err(AssetJobParseError::EmptyField(input.to_owned()));
        }
        Ok(Self::new(*workdir, *source, *output))
    }
}

impl TryFrom<String> for AssetJob {
    type Error = AssetJobParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetJob> for String {
    fn from(job: AssetJob) -> Self {
        job.to_string()
    }
}

/// Errors produced when parsing [`EnvAssignment`] values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvAssignmentParseError {
    /// The assignment operator was missing.
    #[error("environment assignment '{0}' is missing '='")]
    MissingAssignment(String),
    /// The variable name was blank.
    #[error("environment assignment '{0}' has an empty name")]
    EmptyName(String),
}

/// Environment variable applied to the supervised service, `KEY=VALUE`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct EnvAssignment {
    /// Variable name.
    pub key: String,
    /// Variable value; may be empty.
    pub value: String,
}

impl EnvAssignment {
    /// Creates a new assignment.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EnvAssignment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}={}", self.key, self.value)
    }
}

impl FromStr for EnvAssignment {
    type Err = EnvAssignmentParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (key, value) = input
            .split_once('=')
            .ok_or_else(|| EnvAssignmentParseError::MissingAssignment(input.to_owned()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(EnvAssignmentParseError::EmptyName(input.to_owned()));
        }
        Ok(Self::new(key, value))
    }
}

impl TryFrom<String> for EnvAssignment {
    type Error = EnvAssignmentParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnvAssignment> for String {
    fn from(assignment: EnvAssignment) -> Self {
        assignment.to_string()
    }
}
