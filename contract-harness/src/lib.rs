//! Declarative HTTP contract testing.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s; each step sends one
//! request through an [`HttpClient`], normalizes the reply into a
//! [`ResponseEnvelope`] and judges it with an [`Expectation`]. Values
//! captured from one response feed later requests through the per-run
//! [`FixtureStore`].

mod config;
mod data;
mod envelope;
mod error;
mod expectation;
mod fixtures;
mod http_client;
pub mod logging;
pub mod normalizer;
pub mod redaction;
mod report;
mod reporter;
mod runner;
mod schema;
mod stub_server;

pub use config::{HarnessConfiguration, HarnessEnv};
pub use contract_harness_codegen::contract_test;
pub use data::{
    infer_content_type, FilePart, FileSource, Headers, Method, MultipartForm, MultipartPart,
    RequestBody, RequestBuilder, RequestDescriptor,
};
pub use envelope::{Outcome, ResponseEnvelope, TransportError, TransportErrorKind};
pub use error::{ConfigError, Error, Result};
pub use expectation::{
    select, Expectation, Failure, JsonAssertion, Matcher, StatusExpectation, Verdict,
};
pub use fixtures::FixtureStore;
pub use http_client::{ClientConfig, HttpClient, ReqwestHttpClient};
pub use report::{
    ErrorCause, RequestSummary, ScenarioError, ScenarioReport, ScenarioState, StepRecord,
    StepStatus,
};
pub use reporter::{ArtifactReporter, MemoryReporter, Reporter, TracingReporter};
pub use runner::{FailurePolicy, PollPolicy, Scenario, ScenarioRunner, Step};
pub use schema::{CompiledSchema, SchemaIssue, SchemaValidator, ValidationReport};
pub use stub_server::{RecordedRequest, StubResponse, StubRoutes, StubServer};

#[doc(hidden)]
pub mod __private {
    pub use tokio;
    pub use tracing;
}
