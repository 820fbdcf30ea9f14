use crate::{
    data::RequestDescriptor,
    envelope::ResponseEnvelope,
    error::{Error, Result},
    expectation::{self, Expectation, Failure},
    fixtures::FixtureStore,
    http_client::HttpClient,
    report::{
        ErrorCause, RequestSummary, ScenarioError, ScenarioReport, ScenarioState, StepRecord,
        StepStatus,
    },
    reporter::Reporter,
};
use futures::future::join_all;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::time::{self, Instant};

type RequestFn = Box<dyn Fn(&FixtureStore) -> Result<RequestDescriptor> + Send + Sync>;
type ExpectFn =
    Box<dyn Fn(&ResponseEnvelope, &mut FixtureStore) -> Result<Expectation> + Send + Sync>;
type PollCondition = Box<dyn Fn(&ResponseEnvelope) -> bool + Send + Sync>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailurePolicy {
    /// The first failing step halts the scenario; later steps are skipped.
    StopOnFailure,
    ContinueOnFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::StopOnFailure
    }
}

/// Bounded polling for endpoints that complete in the background.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 10,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Capture {
    path: String,
    fixture: String,
}

/// One request and what its response must satisfy.
pub struct Step {
    name: String,
    request: RequestFn,
    expect: ExpectFn,
    captures: Vec<Capture>,
    poll: Option<(PollCondition, PollPolicy)>,
}

impl Step {
    /// # Arguments
    /// `request` - builds the request from the fixtures captured so far.
    /// `expect` - builds the expectation; it sees the response and may write fixtures.
    pub fn new<S, R, E>(name: S, request: R, expect: E) -> Self
    where
        S: Into<String>,
        R: Fn(&FixtureStore) -> Result<RequestDescriptor> + Send + Sync + 'static,
        E: Fn(&ResponseEnvelope, &mut FixtureStore) -> Result<Expectation> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            request: Box::new(request),
            expect: Box::new(expect),
            captures: Vec::new(),
            poll: None,
        }
    }

    /// A step whose request and expectation do not depend on earlier steps
    /// beyond `{name}` placeholders.
    pub fn fixed<S: Into<String>>(
        name: S,
        request: RequestDescriptor,
        expectation: Expectation,
    ) -> Self {
        Self::new(
            name,
            move |_| Ok(request.clone()),
            move |_, _| Ok(expectation.clone()),
        )
    }

    /// After the step passes, stores the value at `path` as fixture `fixture`.
    /// A missing value is reported as a contract violation of this step.
    pub fn capture<S1: Into<String>, S2: Into<String>>(mut self, path: S1, fixture: S2) -> Self {
        self.captures.push(Capture {
            path: path.into(),
            fixture: fixture.into(),
        });
        self
    }

    /// Re-sends the request until `condition` holds or `policy` runs out; the
    /// last response is the one evaluated.
    pub fn poll_until<C>(mut self, condition: C, policy: PollPolicy) -> Self
    where
        C: Fn(&ResponseEnvelope) -> bool + Send + Sync + 'static,
    {
        self.poll = Some((Box::new(condition), policy));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Default)]
pub struct Scenario {
    name: String,
    description: Option<String>,
    labels: BTreeMap<String, String>,
    steps: Vec<Step>,
    failure_policy: Option<FailurePolicy>,
    timeout: Option<Duration>,
}

impl Scenario {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn label<S1: Into<String>, S2: Into<String>>(mut self, key: S1, value: S2) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = Some(failure_policy);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

enum StepError {
    Usage(Error),
    Timeout,
}

impl From<Error> for StepError {
    fn from(e: Error) -> Self {
        StepError::Usage(e)
    }
}

/// Drives scenarios: one fresh [`FixtureStore`] per run, steps strictly in order.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    client: Arc<dyn HttpClient + Send + Sync>,
    reporters: Vec<Arc<dyn Reporter + Send + Sync>>,
    seed_fixtures: FixtureStore,
    failure_policy: FailurePolicy,
    scenario_timeout: Option<Duration>,
}

impl ScenarioRunner {
    pub fn new(client: Arc<dyn HttpClient + Send + Sync>) -> Self {
        Self {
            client,
            reporters: Vec::new(),
            seed_fixtures: FixtureStore::new(),
            failure_policy: FailurePolicy::default(),
            scenario_timeout: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter + Send + Sync>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Values copied into every run's store before its first step.
    pub fn with_seed_fixtures(mut self, fixtures: FixtureStore) -> Self {
        self.seed_fixtures = fixtures;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout = Some(timeout);
        self
    }

    /// Runs independent scenarios concurrently. Reports come back in input order.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<ScenarioReport> {
        join_all(scenarios.iter().map(|scenario| self.run(scenario))).await
    }

    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let mut report = ScenarioReport {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            labels: scenario.labels.clone(),
            state: ScenarioState::Pending,
            steps: Vec::new(),
            error: None,
            elapsed: Duration::ZERO,
        };
        let policy = scenario.failure_policy.unwrap_or(self.failure_policy);
        let started = Instant::now();
        let deadline = scenario
            .timeout
            .or(self.scenario_timeout)
            .map(|timeout| started + timeout);

        let mut fixtures = self.seed_fixtures.clone();
        report.state = ScenarioState::Running;
        for reporter in &self.reporters {
            reporter.scenario_started(&report);
        }
        tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "scenario started");

        let mut failed = false;
        for (index, step) in scenario.steps.iter().enumerate() {
            let halted =
                report.error.is_some() || (failed && policy == FailurePolicy::StopOnFailure);
            let record = if halted {
                StepRecord::new(index, step.name.as_str())
            } else {
                let mut record = StepRecord::new(index, step.name.as_str());
                match self.run_step(step, &mut fixtures, deadline, &mut record).await {
                    Ok(()) => {}
                    Err(StepError::Usage(e)) => {
                        record.status = StepStatus::Errored;
                        record.error = Some(e.to_string());
                        report.error = Some(ScenarioError {
                            cause: ErrorCause::Usage,
                            step: Some(index),
                            message: e.to_string(),
                        });
                    }
                    Err(StepError::Timeout) => {
                        let message = format!(
                            "scenario timed out after {} ms",
                            started.elapsed().as_millis()
                        );
                        record.status = StepStatus::Errored;
                        record.error = Some(message.clone());
                        report.error = Some(ScenarioError {
                            cause: ErrorCause::Timeout,
                            step: Some(index),
                            message,
                        });
                    }
                }
                record
            };

            match record.status {
                StepStatus::Passed => {
                    tracing::info!(scenario = %scenario.name, step = %record.name, "step passed")
                }
                StepStatus::Skipped => {
                    tracing::debug!(scenario = %scenario.name, step = %record.name, "step skipped")
                }
                StepStatus::Failed | StepStatus::TransportFailed => {
                    failed = true;
                    tracing::warn!(
                        scenario = %scenario.name,
                        step = %record.name,
                        status = ?record.status,
                        "step failed"
                    );
                }
                StepStatus::Errored => {
                    tracing::error!(
                        scenario = %scenario.name,
                        step = %record.name,
                        error = ?record.error,
                        "step errored"
                    )
                }
            }

            for reporter in &self.reporters {
                reporter.step_finished(&report, &record);
            }
            report.steps.push(record);
        }

        fixtures.clear();
        report.state = if report.error.is_some() {
            ScenarioState::Errored
        } else if failed {
            ScenarioState::Failed
        } else {
            ScenarioState::Passed
        };
        report.elapsed = started.elapsed();

        tracing::info!(
            scenario = %report.name,
            state = ?report.state,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scenario finished"
        );
        for reporter in &self.reporters {
            reporter.scenario_finished(&report);
        }

        report
    }

    async fn run_step(
        &self,
        step: &Step,
        fixtures: &mut FixtureStore,
        deadline: Option<Instant>,
        record: &mut StepRecord,
    ) -> std::result::Result<(), StepError> {
        let request = (step.request)(&*fixtures)?.resolve(&*fixtures)?;
        record.request = Some(RequestSummary::from(&request));

        let (envelope, attempts) = match deadline {
            Some(deadline) => time::timeout_at(deadline, self.obtain_response(step, &request))
                .await
                .map_err(|_| StepError::Timeout)??,
            None => self.obtain_response(step, &request).await?,
        };
        record.attempts = attempts;

        let expectation = (step.expect)(&envelope, fixtures)?;
        let mut verdict = expectation.evaluate(&envelope)?;

        if verdict.passed() {
            if let Some(json) = envelope.json() {
                for capture in &step.captures {
                    match expectation::select(json, &capture.path)?.as_slice() {
                        [value] => fixtures.set(capture.fixture.clone(), (*value).clone()),
                        _ => verdict.failures.push(Failure {
                            check: capture.path.clone(),
                            expected: format!("a single value to capture as {}", capture.fixture),
                            actual: String::from("<missing>"),
                        }),
                    }
                }
            } else if !step.captures.is_empty() {
                verdict.failures.push(Failure {
                    check: String::from("capture"),
                    expected: String::from("a JSON body"),
                    actual: envelope.body().chars().take(200).collect(),
                });
            }
        }

        record.status = if verdict.passed() {
            StepStatus::Passed
        } else if verdict.is_transport_failure() {
            StepStatus::TransportFailed
        } else {
            StepStatus::Failed
        };
        record.verdict = Some(verdict);
        record.response = Some(envelope);

        Ok(())
    }

    async fn obtain_response(
        &self,
        step: &Step,
        request: &RequestDescriptor,
    ) -> Result<(ResponseEnvelope, u32)> {
        let (condition, policy) = match &step.poll {
            Some(poll) => poll,
            None => return Ok((self.client.send(request).await?, 1)),
        };

        let started = Instant::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let envelope = self.client.send(request).await?;
            if condition(&envelope)
                || attempts >= policy.max_attempts
                || started.elapsed() + policy.interval > policy.timeout
            {
                tracing::debug!(step = %step.name, attempts, "polling finished");
                return Ok((envelope, attempts));
            }
            time::sleep(policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Method,
        http_client::{ClientConfig, ReqwestHttpClient},
        reporter::MemoryReporter,
        stub_server::{StubResponse, StubRoutes, StubServer},
    };
    use serde_json::json;

    const LINK_TYPE_ID: &str = "6c1f0b4e-8a51-4a43-9d0e-3a1f7a0c2b11";

    fn runner_for(server: &StubServer) -> ScenarioRunner {
        let client = ReqwestHttpClient::with_config(ClientConfig {
            base_url: Some(server.url()),
            ..ClientConfig::default()
        })
        .unwrap();
        ScenarioRunner::new(Arc::new(client))
    }

    fn crud_scenario() -> Scenario {
        Scenario::new("link type lifecycle")
            .label("subsystem", "ontology")
            .step(
                Step::new(
                    "create",
                    |_| {
                        RequestDescriptor::post("/LinkType")
                            .json(json!({
                                "name": "Test Linktype",
                                "left": { "objectTypeId": "a" },
                                "right": { "objectTypeId": "b" }
                            }))
                            .build()
                    },
                    |_, _| Ok(Expectation::status(200).exists("/id")),
                )
                .capture("/id", "linkTypeId"),
            )
            .step(Step::fixed(
                "get",
                RequestDescriptor::get("/LinkType")
                    .query("id", "{linkTypeId}")
                    .build()
                    .unwrap(),
                Expectation::status(200).equals("/name", "Test Linktype"),
            ))
            .step(Step::new(
                "delete",
                |fixtures| {
                    let id = fixtures.get_str("linkTypeId")?;
                    RequestDescriptor::delete(format!("/LinkType/{}", id)).build()
                },
                |_, _| Ok(Expectation::status(200)),
            ))
            .step(Step::fixed(
                "get after delete",
                RequestDescriptor::get("/LinkType")
                    .query("id", "{linkTypeId}")
                    .build()
                    .unwrap(),
                Expectation::status_in([404, 204]),
            ))
    }

    fn get_ok(name: &str, path: &str) -> Step {
        Step::fixed(
            name,
            RequestDescriptor::get(path).build().unwrap(),
            Expectation::status(200),
        )
    }

    fn deleting() -> StubResponse {
        StubResponse::json(200, json!({ "status": "Deleting" }))
    }

    fn crud_routes(get_status_after_create: u16) -> StubRoutes {
        StubRoutes::new()
            .route(
                Method::Post,
                "/LinkType",
                StubResponse::json(200, json!({ "id": LINK_TYPE_ID })),
            )
            .route(
                Method::Get,
                "/LinkType",
                StubResponse::json(
                    get_status_after_create,
                    json!({ "id": LINK_TYPE_ID, "name": "Test Linktype" }),
                ),
            )
            .route(Method::Get, "/LinkType", StubResponse::empty(204))
            .route(
                Method::Delete,
                format!("/LinkType/{}", LINK_TYPE_ID),
                StubResponse::json(200, json!(true)),
            )
    }

    #[tokio::test]
    async fn conforming_crud_scenario_passes_and_reuses_the_captured_id() {
        let server = StubServer::start(crud_routes(200)).await.unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let runner = runner_for(&server).with_reporter(reporter.clone());

        let report = runner.run(&crud_scenario()).await;

        assert_eq!(report.state, ScenarioState::Passed, "{}", report);
        assert!(report.steps.iter().all(|step| step.status == StepStatus::Passed));
        let requests = server.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].query.as_deref(), Some(&*format!("id={}", LINK_TYPE_ID)));
        assert_eq!(requests[2].path, format!("/LinkType/{}", LINK_TYPE_ID));
        assert_eq!(reporter.reports().len(), 1);
    }

    #[tokio::test]
    async fn first_failing_step_halts_the_scenario_by_default() {
        let server = StubServer::start(crud_routes(500)).await.unwrap();

        let report = runner_for(&server).run(&crud_scenario()).await;

        assert_eq!(report.state, ScenarioState::Failed);
        let statuses: Vec<StepStatus> = report.steps.iter().map(|step| step.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Passed, StepStatus::Failed, StepStatus::Skipped, StepStatus::Skipped]
        );
        assert_eq!(server.requests().len(), 2);
        assert_eq!(report.first_failure().map(|step| step.name.as_str()), Some("get"));
    }

    #[tokio::test]
    async fn continue_on_failure_runs_every_step() {
        let server = StubServer::start(crud_routes(500)).await.unwrap();

        let report = runner_for(&server)
            .with_failure_policy(FailurePolicy::ContinueOnFailure)
            .run(&crud_scenario())
            .await;

        assert_eq!(report.state, ScenarioState::Failed);
        assert!(report.steps.iter().all(|step| step.status != StepStatus::Skipped));
        assert_eq!(server.requests().len(), 4);
    }

    #[tokio::test]
    async fn missing_fixture_errors_the_scenario() {
        let server = StubServer::start(StubRoutes::new()).await.unwrap();
        let scenario = Scenario::new("delete without create")
            .failure_policy(FailurePolicy::ContinueOnFailure)
            .step(Step::fixed(
                "delete",
                RequestDescriptor::delete("/File/{fileId}").build().unwrap(),
                Expectation::status(200),
            ))
            .step(Step::fixed(
                "list",
                RequestDescriptor::get("/File").build().unwrap(),
                Expectation::status(200),
            ));

        let report = runner_for(&server).run(&scenario).await;

        assert_eq!(report.state, ScenarioState::Errored);
        let error = report.error.as_ref().unwrap();
        assert_eq!(error.cause, ErrorCause::Usage);
        assert!(error.message.contains("fileId"));
        assert_eq!(report.steps[1].status, StepStatus::Skipped);
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn fixtures_do_not_leak_between_runs() {
        let server = StubServer::start(StubRoutes::new().route(
            Method::Post,
            "/Folder",
            StubResponse::json(200, json!({ "id": "f1" })),
        ))
        .await
        .unwrap();
        let runner = runner_for(&server);
        let creates = Scenario::new("create folder").step(
            Step::fixed(
                "create",
                RequestDescriptor::post("/Folder")
                    .json(json!({ "name": "A" }))
                    .build()
                    .unwrap(),
                Expectation::status(200),
            )
            .capture("/id", "folderId"),
        );
        let reads = Scenario::new("read folder").step(Step::fixed(
            "get",
            RequestDescriptor::get("/Folder/{folderId}").build().unwrap(),
            Expectation::status(200),
        ));

        assert!(runner.run(&creates).await.passed());
        let report = runner.run(&reads).await;

        assert_eq!(report.state, ScenarioState::Errored);
    }

    #[tokio::test]
    async fn seed_fixtures_are_visible_to_every_run() {
        let server = StubServer::start(StubRoutes::new().route(
            Method::Get,
            "/Dataset/1042",
            StubResponse::json(200, json!({ "id": 1042 })),
        ))
        .await
        .unwrap();
        let seed: FixtureStore = vec![("datasetId", 1042)].into_iter().collect();
        let scenario = Scenario::new("dataset").step(Step::fixed(
            "get",
            RequestDescriptor::get("/Dataset/{datasetId}").build().unwrap(),
            Expectation::status(200).equals("/id", 1042),
        ));

        let report = runner_for(&server)
            .with_seed_fixtures(seed)
            .run(&scenario)
            .await;

        assert!(report.passed(), "{}", report);
    }

    #[tokio::test]
    async fn transport_failures_are_recorded_not_raised() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = ReqwestHttpClient::with_config(ClientConfig {
            base_url: Some(format!("http://127.0.0.1:{}", port)),
            ..ClientConfig::default()
        })
        .unwrap();
        let scenario = Scenario::new("unreachable").step(Step::fixed(
            "get",
            RequestDescriptor::get("/LinkType").build().unwrap(),
            Expectation::status(200),
        ));

        let report = ScenarioRunner::new(Arc::new(client)).run(&scenario).await;

        assert_eq!(report.state, ScenarioState::Failed);
        assert_eq!(report.steps[0].status, StepStatus::TransportFailed);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn scenario_timeout_errors_and_skips_the_rest() {
        let server = StubServer::start(
            StubRoutes::new()
                .route(Method::Get, "/Fast", StubResponse::json(200, json!({})))
                .route(
                    Method::Get,
                    "/Slow",
                    StubResponse::json(200, json!({})).with_delay(Duration::from_secs(5)),
                ),
        )
        .await
        .unwrap();
        let scenario = Scenario::new("slow")
            .timeout(Duration::from_millis(300))
            .step(get_ok("fast", "/Fast"))
            .step(get_ok("slow", "/Slow"))
            .step(get_ok("after", "/Fast"));

        let report = runner_for(&server).run(&scenario).await;

        assert_eq!(report.state, ScenarioState::Errored);
        assert_eq!(report.error.as_ref().map(|e| e.cause), Some(ErrorCause::Timeout));
        let statuses: Vec<StepStatus> = report.steps.iter().map(|step| step.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Passed, StepStatus::Errored, StepStatus::Skipped]
        );
    }

    #[tokio::test]
    async fn polling_stops_once_the_condition_holds() {
        let server = StubServer::start(
            StubRoutes::new()
                .route(Method::Get, "/File/f1", deleting())
                .route(Method::Get, "/File/f1", deleting())
                .route(Method::Get, "/File/f1", StubResponse::empty(204)),
        )
        .await
        .unwrap();
        let scenario = Scenario::new("background delete").step(
            Step::fixed(
                "wait for delete",
                RequestDescriptor::get("/File/f1").build().unwrap(),
                Expectation::status(204),
            )
            .poll_until(
                |envelope| envelope.status_code() == Some(204),
                PollPolicy {
                    interval: Duration::from_millis(10),
                    max_attempts: 5,
                    timeout: Duration::from_secs(2),
                },
            ),
        );

        let report = runner_for(&server).run(&scenario).await;

        assert!(report.passed(), "{}", report);
        assert_eq!(report.steps[0].attempts, 3);
    }

    #[tokio::test]
    async fn polling_gives_up_after_max_attempts() {
        let server = StubServer::start(StubRoutes::new().route(Method::Get, "/File/f1", deleting()))
            .await
            .unwrap();
        let scenario = Scenario::new("never deleted").step(
            Step::fixed(
                "wait for delete",
                RequestDescriptor::get("/File/f1").build().unwrap(),
                Expectation::status(204),
            )
            .poll_until(
                |envelope| envelope.status_code() == Some(204),
                PollPolicy {
                    interval: Duration::from_millis(5),
                    max_attempts: 3,
                    timeout: Duration::from_secs(2),
                },
            ),
        );

        let report = runner_for(&server).run(&scenario).await;

        assert_eq!(report.state, ScenarioState::Failed);
        assert_eq!(report.steps[0].attempts, 3);
    }

    #[tokio::test]
    async fn missing_capture_value_is_a_contract_violation() {
        let server = StubServer::start(StubRoutes::new().route(
            Method::Post,
            "/LinkType",
            StubResponse::json(200, json!({ "name": "x" })),
        ))
        .await
        .unwrap();
        let scenario = Scenario::new("no id").step(
            Step::fixed(
                "create",
                RequestDescriptor::post("/LinkType").json(json!({})).build().unwrap(),
                Expectation::status(200),
            )
            .capture("/id", "linkTypeId"),
        );

        let report = runner_for(&server).run(&scenario).await;

        assert_eq!(report.state, ScenarioState::Failed);
        assert_eq!(report.steps[0].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn expectation_functions_can_write_fixtures() {
        let server = StubServer::start(
            StubRoutes::new()
                .route(
                    Method::Get,
                    "/Folder",
                    StubResponse::json(200, json!([{ "id": "root", "name": "Root" }])),
                )
                .route(
                    Method::Get,
                    "/Folder/root",
                    StubResponse::json(200, json!({ "id": "root" })),
                ),
        )
        .await
        .unwrap();
        let scenario = Scenario::new("browse")
            .step(Step::new(
                "list",
                |_| RequestDescriptor::get("/Folder").build(),
                |envelope, fixtures| {
                    if let Some(id) = envelope.json().and_then(|json| json.pointer("/0/id")) {
                        fixtures.set("rootId", id.clone());
                    }
                    Ok(Expectation::status(200))
                },
            ))
            .step(Step::fixed(
                "open",
                RequestDescriptor::get("/Folder/{rootId}").build().unwrap(),
                Expectation::status(200).equals("/id", "root"),
            ));

        let report = runner_for(&server).run(&scenario).await;

        assert!(report.passed(), "{}", report);
    }

    #[tokio::test]
    async fn run_all_keeps_input_order_and_isolates_failures() {
        let server = StubServer::start(
            StubRoutes::new()
                .route(Method::Get, "/ok", StubResponse::json(200, json!({})))
                .route(Method::Get, "/broken", StubResponse::json(500, json!({}))),
        )
        .await
        .unwrap();
        let scenarios = vec![
            Scenario::new("broken").step(get_ok("get", "/broken")),
            Scenario::new("ok").step(get_ok("get", "/ok")),
        ];

        let reports = runner_for(&server).run_all(&scenarios).await;

        assert_eq!(reports[0].name, "broken");
        assert_eq!(reports[0].state, ScenarioState::Failed);
        assert_eq!(reports[1].state, ScenarioState::Passed);
    }
}
