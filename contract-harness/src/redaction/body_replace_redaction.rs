use super::BodyRedaction;
use regex::Regex;

#[derive(Debug)]
pub struct BodyReplaceRedaction {
    text: String,
    substitution: String,
}

impl BodyReplaceRedaction {
    pub fn new<S1: Into<String>, S2: Into<String>>(text: S1, substitution: S2) -> Self {
        BodyReplaceRedaction {
            text: text.into(),
            substitution: substitution.into(),
        }
    }
}

impl BodyRedaction for BodyReplaceRedaction {
    fn redact(&self, body: &mut String) {
        *body = body.replace(&self.text, &self.substitution);
    }
}

#[derive(Debug)]
pub struct BodyReplaceRegexRedaction {
    pattern: Regex,
    substitution: String,
}

impl BodyReplaceRegexRedaction {
    pub fn new<S: Into<String>>(pattern: Regex, substitution: S) -> Self {
        BodyReplaceRegexRedaction {
            pattern,
            substitution: substitution.into(),
        }
    }
}

impl BodyRedaction for BodyReplaceRegexRedaction {
    fn redact(&self, body: &mut String) {
        *body = self
            .pattern
            .replace_all(body, self.substitution.as_str())
            .into();
    }
}
