use crate::{
    data::{Headers, MultipartPart, RequestBody, RequestDescriptor},
    envelope::ResponseEnvelope,
    expectation::Verdict,
};
use serde::{Serialize, Serializer};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    time::Duration,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum ScenarioState {
    Pending,
    Running,
    Passed,
    Failed,
    Errored,
}

impl ScenarioState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScenarioState::Passed | ScenarioState::Failed | ScenarioState::Errored
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum StepStatus {
    Passed,
    /// The response arrived but violated the expectation.
    Failed,
    /// No response arrived.
    TransportFailed,
    /// The step could not be executed (usage error or scenario timeout).
    Errored,
    Skipped,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum ErrorCause {
    Usage,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioError {
    pub cause: ErrorCause,
    pub step: Option<usize>,
    pub message: String,
}

/// What was sent, in a form that can be logged and serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl From<&RequestDescriptor> for RequestSummary {
    fn from(request: &RequestDescriptor) -> Self {
        let body = match request.body() {
            RequestBody::Empty => None,
            RequestBody::Json(json) => {
                Some(serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string()))
            }
            RequestBody::Multipart(form) => Some(
                form.parts()
                    .iter()
                    .map(|(name, part)| match part {
                        MultipartPart::Text(value) => format!("{}: {}", name, value),
                        MultipartPart::File(file) => format!(
                            "{}: <file {} ({})>",
                            name,
                            file.file_name(),
                            file.content_type()
                        ),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        };

        Self {
            method: request.method().as_str().into(),
            url: request.url().into(),
            headers: request.headers().clone(),
            query: request.query().to_vec(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub request: Option<RequestSummary>,
    pub response: Option<ResponseEnvelope>,
    pub verdict: Option<Verdict>,
    pub error: Option<String>,
    pub attempts: u32,
}

impl StepRecord {
    pub(crate) fn new<S: Into<String>>(index: usize, name: S) -> Self {
        Self {
            index,
            name: name.into(),
            status: StepStatus::Skipped,
            request: None,
            response: None,
            verdict: None,
            error: None,
            attempts: 0,
        }
    }
}

impl Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ... {:?}", self.index, self.name, self.status)?;
        if let Some(request) = &self.request {
            write!(f, "\n    request: {} {}", request.method, request.url)?;
        }
        if let Some(error) = &self.error {
            write!(f, "\n    error: {}", error)?;
        }
        if let Some(verdict) = &self.verdict {
            if !verdict.passed() || !verdict.warnings.is_empty() {
                for line in verdict.to_string().lines() {
                    write!(f, "\n    {}", line)?;
                }
            }
        }
        if self.status != StepStatus::Passed {
            if let Some(response) = &self.response {
                write!(f, "\n    response: {}", response)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub description: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub state: ScenarioState,
    pub steps: Vec<StepRecord>,
    pub error: Option<ScenarioError>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.state == ScenarioState::Passed
    }

    pub fn step<S: AsRef<str>>(&self, name: S) -> Option<&StepRecord> {
        self.steps.iter().find(|step| step.name == name.as_ref())
    }

    /// The first step that did not pass, if any.
    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|step| {
            matches!(
                step.status,
                StepStatus::Failed | StepStatus::TransportFailed | StepStatus::Errored
            )
        })
    }
}

impl Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scenario \"{}\": {:?} ({} ms)",
            self.name,
            self.state,
            self.elapsed.as_millis()
        )?;
        if let Some(error) = &self.error {
            write!(f, "\n  {:?} error: {}", error.cause, error.message)?;
        }
        for step in &self.steps {
            write!(f, "\n  {}", step)?;
        }
        Ok(())
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
