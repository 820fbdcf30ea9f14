//! Turns whatever the transport produced into a [`ResponseEnvelope`].
//!
//! Nothing in here returns an error: unparsable bodies become
//! [`Outcome::Text`](crate::Outcome::Text) and network failures become
//! [`Outcome::Transport`](crate::Outcome::Transport).

use crate::{
    data::Headers,
    envelope::{ResponseEnvelope, TransportError, TransportErrorKind},
};
use hyper::HeaderMap;
use std::{error::Error as StdError, io, time::Duration};

pub fn normalize_response<B: AsRef<[u8]>>(
    status_code: u16,
    header_map: &HeaderMap,
    body: B,
    elapsed: Duration,
) -> ResponseEnvelope {
    ResponseEnvelope::from_response(status_code, extract_headers(header_map), body, elapsed)
}

pub fn normalize_transport_error(error: &reqwest::Error, elapsed: Duration) -> ResponseEnvelope {
    ResponseEnvelope::from_transport_error(classify_transport_error(error), elapsed)
}

pub fn classify_transport_error(error: &reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::ConnectionFailed
    } else {
        classify_io_source(error).unwrap_or(TransportErrorKind::Unknown)
    };

    TransportError::new(kind, error_chain(error))
}

fn classify_io_source(error: &(dyn StdError + 'static)) -> Option<TransportErrorKind> {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return match io_error.kind() {
                io::ErrorKind::TimedOut => Some(TransportErrorKind::Timeout),
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected => Some(TransportErrorKind::ConnectionFailed),
                _ => None,
            };
        }
        source = cause.source();
    }
    None
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub(crate) fn extract_headers(header_map: &HeaderMap) -> Headers {
    // it currently ignores header values with opaque characters
    header_map
        .iter()
        .map(|(k, v)| (k.as_str(), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect()
}
