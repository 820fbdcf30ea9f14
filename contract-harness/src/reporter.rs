use crate::{
    error::Result,
    redaction::Redactions,
    report::{ScenarioReport, ScenarioState, StepRecord, StepStatus},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::{
    fmt::Debug,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Observes scenario progress. Reporters cannot change a scenario's outcome.
pub trait Reporter: Debug {
    fn scenario_started(&self, _scenario: &ScenarioReport) {}

    fn step_finished(&self, _scenario: &ScenarioReport, _step: &StepRecord) {}

    fn scenario_finished(&self, scenario: &ScenarioReport);
}

/// Emits one log event per step and a summary per scenario.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn step_finished(&self, scenario: &ScenarioReport, step: &StepRecord) {
        match step.status {
            StepStatus::Passed | StepStatus::Skipped => {
                tracing::debug!(scenario = %scenario.name, "{}", step)
            }
            _ => tracing::warn!(scenario = %scenario.name, "{}", step),
        }
    }

    fn scenario_finished(&self, scenario: &ScenarioReport) {
        match scenario.state {
            ScenarioState::Passed => tracing::info!(
                scenario = %scenario.name,
                steps = scenario.steps.len(),
                elapsed_ms = scenario.elapsed.as_millis() as u64,
                "scenario passed"
            ),
            _ => tracing::error!("{}", scenario),
        }
    }
}

/// Keeps finished reports in memory, mostly for assertions in tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<ScenarioReport>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ScenarioReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Reporter for MemoryReporter {
    fn scenario_finished(&self, scenario: &ScenarioReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(scenario.clone());
    }
}

/// Writes a markdown transcript and a JSON summary per scenario into a directory.
#[derive(Debug)]
pub struct ArtifactReporter {
    dir: PathBuf,
    redactions: Redactions,
}

#[derive(Serialize)]
struct StepSummary<'a> {
    name: &'a str,
    status: StepStatus,
    status_code: Option<u16>,
    failures: Vec<String>,
    warnings: Vec<String>,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct ScenarioSummary<'a> {
    name: &'a str,
    state: ScenarioState,
    elapsed_ms: u64,
    error: Option<&'a str>,
    steps: Vec<StepSummary<'a>>,
}

impl ArtifactReporter {
    /// Credentials are masked by default; use [`ArtifactReporter::with_redactions`] to
    /// replace that.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            redactions: Redactions::credentials(),
        }
    }

    pub fn with_redactions(mut self, redactions: Redactions) -> Self {
        self.redactions = redactions;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn transcript_path(&self, scenario_name: &str) -> PathBuf {
        self.dir.join(format!("{}.md", slug(scenario_name)))
    }

    pub fn summary_path(&self, scenario_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slug(scenario_name)))
    }

    fn write_artifacts(&self, scenario: &ScenarioReport) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.save_transcript(scenario)?;

        let summary = ScenarioSummary {
            name: &scenario.name,
            state: scenario.state,
            elapsed_ms: scenario.elapsed.as_millis() as u64,
            error: scenario.error.as_ref().map(|e| e.message.as_str()),
            steps: scenario
                .steps
                .iter()
                .map(|step| StepSummary {
                    name: &step.name,
                    status: step.status,
                    status_code: step.response.as_ref().and_then(|r| r.status_code()),
                    failures: step
                        .verdict
                        .iter()
                        .flat_map(|v| v.failures.iter().map(ToString::to_string))
                        .collect(),
                    warnings: step
                        .verdict
                        .iter()
                        .flat_map(|v| {
                            v.warnings
                                .iter()
                                .map(|w| format!("{}: {}", w.path, w.message))
                        })
                        .collect(),
                    error: step.error.as_deref(),
                })
                .collect(),
        };
        let summary = self
            .redactions
            .redact_body(serde_json::to_string_pretty(&summary)?);
        fs::write(self.summary_path(&scenario.name), summary)?;

        Ok(())
    }

    fn save_transcript(&self, scenario: &ScenarioReport) -> Result<()> {
        let mut file = File::create(self.transcript_path(&scenario.name))?;

        write!(file, "# Scenario: {}\r\n\r\n", scenario.name)?;
        if let Some(description) = &scenario.description {
            write!(file, "{}\r\n\r\n", description)?;
        }
        write!(
            file,
            "Result: {:?} ({} ms)\r\n\r\n",
            scenario.state,
            scenario.elapsed.as_millis()
        )?;
        if let Some(error) = &scenario.error {
            write!(file, "Error ({:?}): {}\r\n\r\n", error.cause, error.message)?;
        }

        for step in &scenario.steps {
            let request = match &step.request {
                Some(request) => request,
                None => {
                    write!(
                        file,
                        "## Step {}: {} ({:?})\r\n\r\n",
                        step.index, step.name, step.status
                    )?;
                    continue;
                }
            };

            write!(
                file,
                "## Step {}: {} {} ({})\r\n\r\n",
                step.index, request.method, request.url, step.name
            )?;
            write!(file, "### Request headers sent:\r\n\r\n```\r\n")?;
            for (key, value) in self.redactions.redact_headers(&request.headers).iter() {
                write!(file, "{}: {}\r\n", key, value)?;
            }
            write!(file, "```\r\n\r\n")?;
            if !request.query.is_empty() {
                write!(file, "### Query parameters:\r\n\r\n```\r\n")?;
                for (key, value) in &request.query {
                    write!(
                        file,
                        "{}={}\r\n",
                        key,
                        self.redactions.redact_body(value.as_str())
                    )?;
                }
                write!(file, "```\r\n\r\n")?;
            }
            write!(
                file,
                "### Request body sent:\r\n\r\n```\r\n{}\r\n```\r\n\r\n",
                self.redactions
                    .redact_body(request.body.clone().unwrap_or_default()),
            )?;

            if let Some(response) = &step.response {
                write!(file, "### Response headers received:\r\n\r\n```\r\n")?;
                for (key, value) in self.redactions.redact_headers(response.headers()).iter() {
                    write!(file, "{}: {}\r\n", key, value)?;
                }
                write!(file, "```\r\n\r\n")?;
                let status = response
                    .status_code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| String::from("no response"));
                write!(
                    file,
                    "### Response body received ({}: {}):\r\n\r\n```\r\n{}\r\n```\r\n\r\n",
                    status,
                    response.headers().get("content-type").unwrap_or(""),
                    self.redactions.redact_body(response.body()),
                )?;
                if let Some(error) = response.transport_error() {
                    write!(file, "Transport error: {}\r\n\r\n", error)?;
                }
            }

            write!(file, "### Verdict: {:?}\r\n\r\n", step.status)?;
            if let Some(verdict) = &step.verdict {
                for failure in &verdict.failures {
                    write!(file, "- FAIL {}\r\n", failure)?;
                }
                for warning in &verdict.warnings {
                    write!(file, "- WARN {}: {}\r\n", warning.path, warning.message)?;
                }
            }
            if let Some(error) = &step.error {
                write!(file, "- ERROR {}\r\n", error)?;
            }
            write!(file, "\r\n")?;
        }

        Ok(())
    }
}

impl Reporter for ArtifactReporter {
    fn scenario_finished(&self, scenario: &ScenarioReport) {
        if let Err(e) = self.write_artifacts(scenario) {
            tracing::error!(
                scenario = %scenario.name,
                dir = %self.dir.display(),
                "Couldn't write artifacts: {}",
                e
            );
        }
    }
}

fn slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = SLUG_REGEX.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        String::from("scenario")
    } else {
        slug.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::RequestDescriptor,
        envelope::ResponseEnvelope,
        expectation::{Failure, Verdict},
        report::RequestSummary,
    };
    use std::{collections::BTreeMap, time::Duration};

    fn failed_report() -> ScenarioReport {
        let request = RequestDescriptor::post("/LinkType")
            .header("Authorization", "Bearer secret-token")
            .json(serde_json::json!({ "name": "Test Linktype" }))
            .build()
            .unwrap();
        let response = ResponseEnvelope::from_response(
            400,
            vec![("Content-Type", "application/json")].into_iter().collect(),
            r#"{"title":"Validation failed.","status":400,"errors":{"name":["taken"]}}"#,
            Duration::from_millis(12),
        );

        let mut step = StepRecord::new(0, "create");
        step.status = StepStatus::Failed;
        step.request = Some(RequestSummary::from(&request));
        step.response = Some(response);
        step.attempts = 1;
        step.verdict = Some(Verdict {
            failures: vec![Failure {
                check: String::from("status"),
                expected: String::from("200"),
                actual: String::from("400"),
            }],
            warnings: Vec::new(),
            transport_error: None,
        });

        ScenarioReport {
            name: String::from("Link types: create / delete"),
            description: None,
            labels: BTreeMap::new(),
            state: ScenarioState::Failed,
            steps: vec![step, StepRecord::new(1, "delete")],
            error: None,
            elapsed: Duration::from_millis(20),
        }
    }

    #[test]
    fn slugs_are_filesystem_friendly() {
        assert_eq!(slug("Link types: create / delete"), "link-types-create-delete");
        assert_eq!(slug("***"), "scenario");
    }

    #[test]
    fn artifacts_contain_the_transcript_with_credentials_masked() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ArtifactReporter::new(dir.path().join("artifacts"));

        reporter.scenario_finished(&failed_report());

        let transcript =
            fs::read_to_string(reporter.transcript_path("Link types: create / delete")).unwrap();
        assert!(transcript.contains("## Step 0: POST /LinkType (create)"));
        assert!(transcript.contains("authorization: <redacted>"));
        assert!(!transcript.contains("secret-token"));
        assert!(transcript.contains("### Response body received (400: application/json)"));
        assert!(transcript.contains("- FAIL"));
        assert!(transcript.contains("## Step 1: delete (Skipped)"));

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(reporter.summary_path("Link types: create / delete")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["state"], "Failed");
        assert_eq!(summary["steps"][0]["status_code"], 400);
        assert_eq!(summary["steps"][1]["status"], "Skipped");
    }

    #[test]
    fn unwritable_directory_does_not_panic() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let reporter = ArtifactReporter::new(file.path().join("nested"));

        reporter.scenario_finished(&failed_report());
    }

    #[test]
    fn memory_reporter_keeps_finished_reports() {
        let reporter = MemoryReporter::new();

        reporter.scenario_finished(&failed_report());

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].state, ScenarioState::Failed);
    }

    #[test]
    fn query_values_are_redacted_in_the_transcript() {
        let request = RequestDescriptor::get("/File")
            .query("token", "secret-token")
            .query("id", "42")
            .build()
            .unwrap();
        let mut step = StepRecord::new(0, "get file");
        step.status = StepStatus::Passed;
        step.request = Some(RequestSummary::from(&request));
        let report = ScenarioReport {
            name: String::from("Query tokens"),
            description: None,
            labels: BTreeMap::new(),
            state: ScenarioState::Passed,
            steps: vec![step],
            error: None,
            elapsed: Duration::from_millis(3),
        };
        let mut redactions = Redactions::credentials();
        redactions.body_replace("secret-token", "***");
        let dir = tempfile::tempdir().unwrap();
        let reporter = ArtifactReporter::new(dir.path()).with_redactions(redactions);

        reporter.scenario_finished(&report);

        let transcript = fs::read_to_string(reporter.transcript_path("Query tokens")).unwrap();
        assert!(transcript.contains("### Query parameters:"));
        assert!(transcript.contains("token=***"));
        assert!(transcript.contains("id=42"));
        assert!(!transcript.contains("secret-token"));
    }
}
