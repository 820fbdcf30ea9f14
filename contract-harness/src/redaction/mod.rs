//! Redactions applied to report transcripts.
//!
//! They only touch what gets written to artifacts; the runner always
//! evaluates the untouched response.

mod body_replace_redaction;
mod header_redactions;

use crate::data::Headers;
use body_replace_redaction::{BodyReplaceRedaction, BodyReplaceRegexRedaction};
use header_redactions::{MaskHeadersRedaction, RemoveHeadersRedaction, RemoveHeadersRegexRedaction};
use regex::Regex;
use std::fmt::Debug;

pub trait BodyRedaction: Debug {
    fn redact(&self, body: &mut String);
}

pub trait HeadersRedaction: Debug {
    fn redact(&self, headers: &mut Headers);
}

#[derive(Debug)]
enum RedactionType {
    Body(Box<dyn BodyRedaction + Send + Sync>),
    Headers(Box<dyn HeadersRedaction + Send + Sync>),
}

#[derive(Debug, Default)]
pub struct Redactions {
    redactions: Vec<RedactionType>,
}

impl Redactions {
    pub fn new() -> Self {
        Self {
            redactions: Vec::new(),
        }
    }

    /// Masks `Authorization` and `Cookie` style headers.
    pub fn credentials() -> Self {
        let mut redactions = Self::new();
        redactions.mask_headers(["authorization", "cookie", "set-cookie"], "<redacted>");
        redactions
    }

    pub fn remove_headers<S: Into<String>, I: IntoIterator<Item = S>>(
        &mut self,
        headers: I,
    ) -> &mut Self {
        self.add_headers_redaction(RemoveHeadersRedaction::new(headers))
    }

    pub fn remove_headers_regex<I: IntoIterator<Item = Regex>>(
        &mut self,
        patterns: I,
    ) -> &mut Self {
        self.add_headers_redaction(RemoveHeadersRegexRedaction::new(patterns))
    }

    pub fn mask_headers<S1: Into<String>, I: IntoIterator<Item = S1>, S2: Into<String>>(
        &mut self,
        headers: I,
        mask: S2,
    ) -> &mut Self {
        self.add_headers_redaction(MaskHeadersRedaction::new(headers, mask))
    }

    pub fn body_replace<S1: Into<String>, S2: Into<String>>(
        &mut self,
        text: S1,
        replacement: S2,
    ) -> &mut Self {
        self.add_body_redaction(BodyReplaceRedaction::new(text, replacement))
    }

    pub fn body_replace_regex<S: Into<String>>(
        &mut self,
        pattern: Regex,
        replacement: S,
    ) -> &mut Self {
        self.add_body_redaction(BodyReplaceRegexRedaction::new(pattern, replacement))
    }

    pub fn add_headers_redaction<HR: HeadersRedaction + Send + Sync + 'static>(
        &mut self,
        redaction: HR,
    ) -> &mut Self {
        self.redactions
            .push(RedactionType::Headers(Box::new(redaction)));
        self
    }

    pub fn add_body_redaction<BR: BodyRedaction + Send + Sync + 'static>(
        &mut self,
        redaction: BR,
    ) -> &mut Self {
        self.redactions
            .push(RedactionType::Body(Box::new(redaction)));
        self
    }

    pub fn redact_headers(&self, headers: &Headers) -> Headers {
        let mut headers = headers.clone();
        for redaction in &self.redactions {
            if let RedactionType::Headers(hr) = redaction {
                hr.redact(&mut headers);
            }
        }
        headers
    }

    pub fn redact_body<S: Into<String>>(&self, body: S) -> String {
        let mut body = body.into();
        for redaction in &self.redactions {
            if let RedactionType::Body(br) = redaction {
                br.redact(&mut body);
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_redactions_apply_in_order() {
        let headers: Headers = vec![
            ("Authorization", "Bearer secret"),
            ("X-Trace-Id", "abc"),
            ("X-Trace-Span", "def"),
            ("ProjectId", "17"),
        ]
        .into_iter()
        .collect();

        let mut redactions = Redactions::credentials();
        redactions.remove_headers_regex(vec![Regex::new("^x-trace-").unwrap()]);
        redactions.remove_headers(["projectid"]);

        let redacted = redactions.redact_headers(&headers);

        assert_eq!(redacted.get("authorization"), Some("<redacted>"));
        assert_eq!(redacted.len(), 1);
    }

    #[test]
    fn masking_does_not_add_absent_headers() {
        let redacted = Redactions::credentials().redact_headers(&Headers::new());

        assert!(redacted.is_empty());
    }

    #[test]
    fn body_redactions_replace_text_and_patterns() {
        let mut redactions = Redactions::new();
        redactions
            .body_replace("secret-token", "***")
            .body_replace_regex(
                Regex::new(r"[0-9a-f]{8}-([0-9a-f]{4}-){3}[0-9a-f]{12}").unwrap(),
                "<uuid>",
            );

        let body = redactions.redact_body(
            r#"{"token":"secret-token","ids":["6c1f0b4e-8a51-4a43-9d0e-3a1f7a0c2b11","0b4e6c1f-8a51-4a43-9d0e-3a1f7a0c2b11"]}"#,
        );

        assert_eq!(body, r#"{"token":"***","ids":["<uuid>","<uuid>"]}"#);
    }
}
