use crate::data::Headers;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::{
    fmt::{self, Display},
    time::Duration,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum TransportErrorKind {
    ConnectionFailed,
    Timeout,
    Unknown,
}

/// A network-level failure. The original message is kept for diagnostics.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new<S: Into<String>>(kind: TransportErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// The terminal outcome of one request. Exactly one applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum Outcome {
    /// The body parsed as JSON.
    Json(Value),
    /// A response arrived but its body is not JSON (this includes empty bodies).
    Text,
    /// No response arrived.
    Transport(TransportError),
}

/// A normalized response.
///
/// Only constructed through [`ResponseEnvelope::from_response`] and
/// [`ResponseEnvelope::from_transport_error`], which keep the outcome
/// consistent with the rest of the fields: a transport failure never carries
/// a status code, a body or headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    status_code: Option<u16>,
    headers: Headers,
    body: String,
    outcome: Outcome,
    #[serde(serialize_with = "serialize_millis")]
    elapsed: Duration,
}

impl ResponseEnvelope {
    pub fn from_response<B: AsRef<[u8]>>(
        status_code: u16,
        headers: Headers,
        body: B,
        elapsed: Duration,
    ) -> Self {
        let body = body.as_ref();
        let outcome = match serde_json::from_slice::<Value>(body) {
            Ok(json) => Outcome::Json(json),
            Err(_) => Outcome::Text,
        };

        Self {
            status_code: Some(status_code),
            headers,
            body: String::from_utf8_lossy(body).into(),
            outcome,
            elapsed,
        }
    }

    pub fn from_transport_error(error: TransportError, elapsed: Duration) -> Self {
        Self {
            status_code: None,
            headers: Headers::new(),
            body: String::new(),
            outcome: Outcome::Transport(error),
            elapsed,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Json(json) => Some(json),
            _ => None,
        }
    }

    pub fn transport_error(&self) -> Option<&TransportError> {
        match &self.outcome {
            Outcome::Transport(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_transport_error(&self) -> bool {
        self.transport_error().is_some()
    }
}

impl Display for ResponseEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.outcome, self.status_code) {
            (Outcome::Transport(error), _) => write!(f, "transport error ({})", error),
            (_, Some(status_code)) => write!(f, "{} {}", status_code, self.body),
            (_, None) => write!(f, "<no response>"),
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
