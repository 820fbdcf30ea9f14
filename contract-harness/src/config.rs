//! Harness configuration.
//!
//! Everything environment specific (base URLs, project and dataset IDs,
//! timeouts) is read here so that scenarios never hard-code it. Environment
//! values are validated strictly: invalid UTF-8, empty values and malformed
//! numbers or booleans are errors rather than silently ignored.

use crate::{
    data::Headers,
    error::{ConfigError, Result},
    fixtures::FixtureStore,
    http_client::{ClientConfig, ReqwestHttpClient},
    reporter::{ArtifactReporter, TracingReporter},
    runner::{FailurePolicy, ScenarioRunner},
};
use std::{
    collections::BTreeMap,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

/// Environment keys read by [`HarnessConfiguration::from_env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Base URL used by every subsystem without its own override.
    BaseUrl,
    /// Prefix of per-subsystem base URLs, e.g. `CONTRACT_HARNESS_BASE_URL_ONTOLOGY`.
    /// Underscores in the suffix stand for dashes: `_PROJECT_EXPLORER` configures
    /// `project-explorer`.
    BaseUrlPrefix,
    /// Sent as the `ProjectId` header and seeded as the `projectId` fixture.
    ProjectId,
    TimeoutSeconds,
    ScenarioTimeoutSeconds,
    ContinueOnFailure,
    ArtifactsDir,
    /// Prefix of seed fixtures; `CONTRACT_HARNESS_FIXTURE_DATASET_ID` seeds `datasetId`.
    FixturePrefix,
}

impl HarnessEnv {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "CONTRACT_HARNESS_BASE_URL",
            Self::BaseUrlPrefix => "CONTRACT_HARNESS_BASE_URL_",
            Self::ProjectId => "CONTRACT_HARNESS_PROJECT_ID",
            Self::TimeoutSeconds => "CONTRACT_HARNESS_TIMEOUT_SEC",
            Self::ScenarioTimeoutSeconds => "CONTRACT_HARNESS_SCENARIO_TIMEOUT_SEC",
            Self::ContinueOnFailure => "CONTRACT_HARNESS_CONTINUE_ON_FAILURE",
            Self::ArtifactsDir => "CONTRACT_HARNESS_ARTIFACTS_DIR",
            Self::FixturePrefix => "CONTRACT_HARNESS_FIXTURE_",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarnessConfiguration {
    base_url: Option<String>,
    subsystem_base_urls: BTreeMap<String, String>,
    default_headers: Headers,
    request_timeout: Option<Duration>,
    scenario_timeout: Option<Duration>,
    failure_policy: FailurePolicy,
    artifacts_dir: Option<PathBuf>,
    fixtures: FixtureStore,
}

impl HarnessConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_vars(std::env::vars_os())
    }

    /// Loads configuration from an explicit set of variables; unrelated
    /// variables are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut config = Self::new();
        let mut vars: Vec<(String, OsString)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let key: OsString = key.into();
                key.into_string()
                    .ok()
                    .filter(|key| key.starts_with("CONTRACT_HARNESS_"))
                    .map(|key| (key, value.into()))
            })
            .collect();
        vars.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));

        for (key, raw) in vars {
            let value = read_nonempty(&key, raw)?;

            if key == HarnessEnv::BaseUrl.as_str() {
                config.set_base_url(value);
            } else if key == HarnessEnv::ProjectId.as_str() {
                config.set_default_header("ProjectId", value.clone());
                config.set_fixture("projectId", value);
            } else if key == HarnessEnv::TimeoutSeconds.as_str() {
                config.set_request_timeout(parse_timeout_seconds(&key, &value)?);
            } else if key == HarnessEnv::ScenarioTimeoutSeconds.as_str() {
                config.set_scenario_timeout(parse_timeout_seconds(&key, &value)?);
            } else if key == HarnessEnv::ContinueOnFailure.as_str() {
                if parse_bool(&key, &value)? {
                    config.set_failure_policy(FailurePolicy::ContinueOnFailure);
                }
            } else if key == HarnessEnv::ArtifactsDir.as_str() {
                config.set_artifacts_dir(value);
            } else if let Some(subsystem) = key.strip_prefix(HarnessEnv::BaseUrlPrefix.as_str())
            {
                config.set_subsystem_base_url(subsystem, value);
            } else if let Some(name) = key.strip_prefix(HarnessEnv::FixturePrefix.as_str()) {
                config.set_fixture(camel_case(name), value);
            }
        }

        Ok(config)
    }

    pub fn set_base_url<S: Into<String>>(&mut self, base_url: S) {
        self.base_url = Some(base_url.into());
    }

    pub fn base_url(&self) -> Option<&String> {
        self.base_url.as_ref()
    }

    pub fn set_subsystem_base_url<S1: Into<String>, S2: Into<String>>(
        &mut self,
        subsystem: S1,
        base_url: S2,
    ) {
        let subsystem: String = subsystem.into();
        self.subsystem_base_urls
            .insert(subsystem_key(&subsystem), base_url.into());
    }

    /// The subsystem's own base URL, or the shared one. Subsystem names match
    /// case-insensitively and `_` matches `-`.
    pub fn base_url_for<S: AsRef<str>>(&self, subsystem: S) -> Option<&String> {
        self.subsystem_base_urls
            .get(&subsystem_key(subsystem.as_ref()))
            .or(self.base_url.as_ref())
    }

    pub fn set_default_header<S1: AsRef<str>, S2: Into<String>>(
        &mut self,
        name: S1,
        value: S2,
    ) {
        self.default_headers.insert(name, value);
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = Some(timeout);
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn set_scenario_timeout(&mut self, timeout: Duration) {
        self.scenario_timeout = Some(timeout);
    }

    pub fn scenario_timeout(&self) -> Option<Duration> {
        self.scenario_timeout
    }

    pub fn set_failure_policy(&mut self, failure_policy: FailurePolicy) {
        self.failure_policy = failure_policy;
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn set_artifacts_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.artifacts_dir = Some(dir.into());
    }

    pub fn artifacts_dir(&self) -> Option<&Path> {
        self.artifacts_dir.as_deref()
    }

    pub fn set_fixture<S: Into<String>, V: Into<serde_json::Value>>(
        &mut self,
        name: S,
        value: V,
    ) {
        self.fixtures.set(name, value);
    }

    pub fn fixtures(&self) -> &FixtureStore {
        &self.fixtures
    }

    /// `true` when at least one base URL is configured, i.e. there is a live
    /// service to run against.
    pub fn is_live(&self) -> bool {
        self.base_url.is_some() || !self.subsystem_base_urls.is_empty()
    }

    pub fn client_for<S: AsRef<str>>(&self, subsystem: S) -> Result<ReqwestHttpClient> {
        let base_url = self
            .base_url_for(subsystem.as_ref())
            .ok_or_else(|| ConfigError::MissingBaseUrl(subsystem.as_ref().into()))?;

        ReqwestHttpClient::with_config(ClientConfig {
            base_url: Some(base_url.clone()),
            default_headers: self.default_headers.clone(),
            timeout: self.request_timeout,
        })
    }

    /// A runner for one subsystem with fixtures, policy, timeout and reporters
    /// taken from this configuration.
    pub fn runner_for<S: AsRef<str>>(&self, subsystem: S) -> Result<ScenarioRunner> {
        let client = self.client_for(subsystem)?;
        let mut runner = ScenarioRunner::new(Arc::new(client))
            .with_seed_fixtures(self.fixtures.clone())
            .with_failure_policy(self.failure_policy)
            .with_reporter(Arc::new(TracingReporter));

        if let Some(timeout) = self.scenario_timeout {
            runner = runner.with_scenario_timeout(timeout);
        }
        if let Some(dir) = &self.artifacts_dir {
            runner = runner.with_reporter(Arc::new(ArtifactReporter::new(dir)));
        }

        Ok(runner)
    }
}

fn read_nonempty(name: &str, raw: OsString) -> std::result::Result<String, ConfigError> {
    let value = raw
        .into_string()
        .map_err(|_| ConfigError::InvalidUtf8(name.into()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name.into()));
    }
    Ok(value.trim().into())
}

fn parse_timeout_seconds(name: &str, raw: &str) -> std::result::Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(name.into())),
    }
}

fn parse_bool(name: &str, raw: &str) -> std::result::Result<bool, ConfigError> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        return Ok(true);
    }
    if raw.eq_ignore_ascii_case("false") || raw == "0" {
        return Ok(false);
    }
    Err(ConfigError::InvalidBool(name.into()))
}

/// `PROJECT_EXPLORER`, `project_explorer` and `Project-Explorer` -> `project-explorer`
fn subsystem_key(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// `DATASET_ID` -> `datasetId`
fn camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for (i, word) in name.split('_').filter(|word| !word.is_empty()).enumerate() {
        let word = word.to_lowercase();
        if i == 0 {
            result.push_str(&word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                result.extend(first.to_uppercase());
                result.push_str(chars.as_str());
            }
        }
    }
    result
}
