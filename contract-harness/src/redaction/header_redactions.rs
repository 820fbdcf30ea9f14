use super::HeadersRedaction;
use crate::data::Headers;
use regex::Regex;

#[derive(Debug)]
pub struct RemoveHeadersRedaction {
    headers: Vec<String>,
}

impl RemoveHeadersRedaction {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(headers: I) -> Self {
        Self {
            headers: headers
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
        }
    }
}

impl HeadersRedaction for RemoveHeadersRedaction {
    fn redact(&self, headers: &mut Headers) {
        for header_name in &self.headers {
            headers.remove(header_name);
        }
    }
}

#[derive(Debug)]
pub struct RemoveHeadersRegexRedaction {
    patterns: Vec<Regex>,
}

impl RemoveHeadersRegexRedaction {
    pub fn new<I: IntoIterator<Item = Regex>>(patterns: I) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
        }
    }
}

impl HeadersRedaction for RemoveHeadersRegexRedaction {
    fn redact(&self, headers: &mut Headers) {
        let matching: Vec<String> = headers
            .iter()
            .map(|(name, _)| name)
            .filter(|name| self.patterns.iter().any(|pattern| pattern.is_match(name)))
            .cloned()
            .collect();

        for header_name in matching {
            headers.remove(header_name);
        }
    }
}

/// Keeps the header but replaces its value, so a transcript still shows it was sent.
#[derive(Debug)]
pub struct MaskHeadersRedaction {
    headers: Vec<String>,
    mask: String,
}

impl MaskHeadersRedaction {
    pub fn new<S1: Into<String>, I: IntoIterator<Item = S1>, S2: Into<String>>(
        headers: I,
        mask: S2,
    ) -> Self {
        Self {
            headers: headers
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
            mask: mask.into(),
        }
    }
}

impl HeadersRedaction for MaskHeadersRedaction {
    fn redact(&self, headers: &mut Headers) {
        for header_name in &self.headers {
            if headers.contains(header_name) {
                headers.insert(header_name, self.mask.clone());
            }
        }
    }
}
