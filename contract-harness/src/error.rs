use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Harness usage errors.
///
/// These are defects in the scenario code itself (a missing fixture, a
/// malformed request, a schema that does not compile). Transport failures and
/// contract violations are never reported through this type: they are carried
/// by [`ResponseEnvelope`](crate::ResponseEnvelope) and
/// [`Verdict`](crate::Verdict) respectively.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fixture not found: {0}")]
    FixtureNotFound(String),

    #[error("Fixture {name} is not a {expected}")]
    FixtureType { name: String, expected: &'static str },

    #[error("Malformed request descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Multipart form is missing required part \"{0}\"")]
    MissingMultipartPart(String),

    #[error("Invalid JSON path \"{path}\": {reason}")]
    InvalidJsonPath { path: String, reason: String },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid value for header {0}")]
    InvalidHeaderValue(String),

    #[error("Schema does not compile: {0}")]
    SchemaCompile(String),

    #[error("Couldn't build the HTTP client: {0}")]
    ClientBuild(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IoError: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be valid UTF-8")]
    InvalidUtf8(String),

    #[error("{0} must not be empty")]
    Empty(String),

    #[error("{0} must be a positive integer number of seconds")]
    InvalidTimeout(String),

    #[error("{0} must be 1, 0, true, or false")]
    InvalidBool(String),

    #[error("No base URL configured for subsystem \"{0}\"")]
    MissingBaseUrl(String),
}
