use crate::{
    envelope::{ResponseEnvelope, TransportError},
    error::{Error, Result},
    schema::{CompiledSchema, SchemaIssue},
};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StatusExpectation {
    Exact(u16),
    OneOf(Vec<u16>),
    Any,
}

impl StatusExpectation {
    pub fn matches(&self, status_code: u16) -> bool {
        match self {
            StatusExpectation::Exact(expected) => *expected == status_code,
            StatusExpectation::OneOf(expected) => expected.contains(&status_code),
            StatusExpectation::Any => true,
        }
    }
}

impl Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusExpectation::Exact(code) => write!(f, "{}", code),
            StatusExpectation::OneOf(codes) => {
                let codes: Vec<String> = codes.iter().map(u16::to_string).collect();
                write!(f, "one of [{}]", codes.join(", "))
            }
            StatusExpectation::Any => write!(f, "any"),
        }
    }
}

/// How a value selected from the body is compared.
///
/// `Contains` means: an equal (or, for objects, subset-matching) element of an
/// array, a substring of a string, or a subset of an object's fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Matcher {
    Equals(Value),
    Contains(Value),
    Exists,
    Absent,
}

impl Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Equals(value) => write!(f, "equals {}", value),
            Matcher::Contains(value) => write!(f, "contains {}", value),
            Matcher::Exists => write!(f, "exists"),
            Matcher::Absent => write!(f, "is absent"),
        }
    }
}

/// An assertion on the JSON body. `path` is a JSON Pointer (`/errors/`, where
/// the trailing empty segment addresses the `""` key) or a JSONPath (`$.errors`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonAssertion {
    pub path: String,
    pub matcher: Matcher,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub check: String,
    pub expected: String,
    pub actual: String,
}

impl Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, actual {}",
            self.check, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub failures: Vec<Failure>,
    pub warnings: Vec<SchemaIssue>,
    pub transport_error: Option<TransportError>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.transport_error.is_none()
    }

    pub fn is_transport_failure(&self) -> bool {
        self.transport_error.is_some()
    }

    pub fn is_contract_violation(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.transport_error {
            return write!(f, "TRANSPORT ERROR {}", error);
        }
        if self.failures.is_empty() {
            write!(f, "PASSED")?;
        } else {
            write!(f, "FAILED")?;
            for failure in &self.failures {
                write!(f, "\n  {}", failure)?;
            }
        }
        for warning in &self.warnings {
            write!(f, "\n  warning {}: {}", warning.path, warning.message)?;
        }
        Ok(())
    }
}

/// What one step expects of its response.
#[derive(Debug, Clone)]
pub struct Expectation {
    status: StatusExpectation,
    schema: Option<CompiledSchema>,
    assertions: Vec<JsonAssertion>,
}

impl Expectation {
    pub fn status(status_code: u16) -> Self {
        Self::with_status(StatusExpectation::Exact(status_code))
    }

    pub fn status_in<I: IntoIterator<Item = u16>>(status_codes: I) -> Self {
        Self::with_status(StatusExpectation::OneOf(status_codes.into_iter().collect()))
    }

    pub fn any_status() -> Self {
        Self::with_status(StatusExpectation::Any)
    }

    fn with_status(status: StatusExpectation) -> Self {
        Self {
            status,
            schema: None,
            assertions: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: CompiledSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn equals<S: Into<String>, V: Into<Value>>(self, path: S, value: V) -> Self {
        self.assert(path, Matcher::Equals(value.into()))
    }

    pub fn contains<S: Into<String>, V: Into<Value>>(self, path: S, value: V) -> Self {
        self.assert(path, Matcher::Contains(value.into()))
    }

    pub fn exists<S: Into<String>>(self, path: S) -> Self {
        self.assert(path, Matcher::Exists)
    }

    pub fn absent<S: Into<String>>(self, path: S) -> Self {
        self.assert(path, Matcher::Absent)
    }

    pub fn assert<S: Into<String>>(mut self, path: S, matcher: Matcher) -> Self {
        self.assertions.push(JsonAssertion {
            path: path.into(),
            matcher,
        });
        self
    }

    pub fn status_expectation(&self) -> &StatusExpectation {
        &self.status
    }

    pub fn assertions(&self) -> &[JsonAssertion] {
        &self.assertions
    }

    /// Evaluates every check against `envelope` and collects all failures.
    ///
    /// # Returns
    /// The verdict, or [`Error::InvalidJsonPath`] when an assertion path cannot
    /// be parsed.
    pub fn evaluate(&self, envelope: &ResponseEnvelope) -> Result<Verdict> {
        let mut verdict = Verdict {
            failures: Vec::new(),
            warnings: Vec::new(),
            transport_error: None,
        };

        let status_code = match (envelope.transport_error(), envelope.status_code()) {
            (Some(error), _) => {
                verdict.transport_error = Some(error.clone());
                return Ok(verdict);
            }
            (None, Some(status_code)) => status_code,
            (None, None) => {
                return Err(Error::MalformedDescriptor(
                    "response envelope has neither a status nor a transport error".into(),
                ))
            }
        };

        if !self.status.matches(status_code) {
            verdict.failures.push(Failure {
                check: String::from("status"),
                expected: self.status.to_string(),
                actual: status_code.to_string(),
            });
        }

        if let Some(schema) = &self.schema {
            match envelope.json() {
                Some(json) => {
                    let report = schema.validate(json);
                    verdict
                        .failures
                        .extend(report.errors.into_iter().map(|issue| Failure {
                            check: format!("schema {}", issue.path),
                            expected: String::from("a conforming value"),
                            actual: issue.message,
                        }));
                    verdict.warnings.extend(report.warnings);
                }
                None => verdict.failures.push(not_json_failure("schema", envelope)),
            }
        }

        for assertion in &self.assertions {
            let json = match envelope.json() {
                Some(json) => json,
                None => {
                    verdict
                        .failures
                        .push(not_json_failure(&assertion.path, envelope));
                    continue;
                }
            };

            let selected = select(json, &assertion.path)?;
            if !matches(&assertion.matcher, &selected) {
                verdict.failures.push(Failure {
                    check: assertion.path.clone(),
                    expected: assertion.matcher.to_string(),
                    actual: describe(&selected),
                });
            }
        }

        Ok(verdict)
    }
}

/// Selects the values addressed by a JSON Pointer or JSONPath expression.
pub fn select<'a>(json: &'a Value, path: &str) -> Result<Vec<&'a Value>> {
    if path.is_empty() || path.starts_with('/') {
        Ok(json.pointer(path).into_iter().collect())
    } else if path.starts_with('$') {
        jsonpath_lib::select(json, path).map_err(|e| Error::InvalidJsonPath {
            path: path.into(),
            reason: format!("{:?}", e),
        })
    } else {
        Err(Error::InvalidJsonPath {
            path: path.into(),
            reason: String::from("expected a JSON Pointer (\"/...\") or a JSONPath (\"$...\")"),
        })
    }
}

fn matches(matcher: &Matcher, selected: &[&Value]) -> bool {
    match matcher {
        Matcher::Exists => !selected.is_empty(),
        Matcher::Absent => selected.is_empty(),
        Matcher::Equals(expected) => match selected {
            [] => false,
            [single] => *single == expected,
            many => {
                Value::Array(many.iter().map(|value| (*value).clone()).collect()) == *expected
            }
        },
        Matcher::Contains(expected) => selected.iter().any(|actual| contains(actual, expected)),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Array(elements), _) => elements
            .iter()
            .any(|element| element == expected || subset(element, expected)),
        (Value::String(text), Value::String(fragment)) => text.contains(fragment.as_str()),
        (Value::Object(_), Value::Object(_)) => subset(actual, expected),
        _ => actual == expected,
    }
}

fn subset(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => {
            expected.iter().all(|(key, expected_value)| {
                actual
                    .get(key)
                    .map_or(false, |actual_value| subset(actual_value, expected_value))
            })
        }
        _ => actual == expected,
    }
}

fn describe(selected: &[&Value]) -> String {
    match selected {
        [] => String::from("<missing>"),
        [single] => single.to_string(),
        many => Value::Array(many.iter().map(|value| (*value).clone()).collect()).to_string(),
    }
}

fn not_json_failure(check: &str, envelope: &ResponseEnvelope) -> Failure {
    let mut body: String = envelope.body().chars().take(200).collect();
    if body.is_empty() {
        body = String::from("<empty body>");
    }
    Failure {
        check: check.into(),
        expected: String::from("a JSON body"),
        actual: body,
    }
}
