use crate::{
    error::{Error, Result},
    fixtures::FixtureStore,
};
use hyper::header::{HeaderName, HeaderValue};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    path::{Path, PathBuf},
    time::Duration,
};

lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex =
        Regex::new(r"\{(?P<fixture_name>[A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap();
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive header mapping. Names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert<S1: AsRef<str>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.0
            .insert(name.as_ref().to_lowercase(), value.into());
    }

    pub fn get<S: AsRef<str>>(&self, name: S) -> Option<&str> {
        self.0
            .get(&name.as_ref().to_lowercase())
            .map(String::as_str)
    }

    pub fn remove<S: AsRef<str>>(&mut self, name: S) -> Option<String> {
        self.0.remove(&name.as_ref().to_lowercase())
    }

    pub fn contains<S: AsRef<str>>(&self, name: S) -> bool {
        self.0.contains_key(&name.as_ref().to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy of `self` overlaid with `overrides`; `overrides` wins on conflict.
    pub fn merged_with(&self, overrides: &Headers) -> Headers {
        let mut merged = self.clone();
        for (name, value) in overrides.iter() {
            merged.insert(name, value.clone());
        }
        merged
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Bytes { file_name: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub source: FileSource,
    pub content_type: Option<String>,
}

impl FilePart {
    pub fn file_name(&self) -> String {
        match &self.source {
            FileSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            FileSource::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// The explicit content type, or one inferred from the file extension.
    pub fn content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| infer_content_type(self.file_name()).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    File(FilePart),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<(String, MultipartPart)>,
    required: Vec<String>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file<S: Into<String>, P: Into<PathBuf>>(mut self, name: S, path: P) -> Self {
        self.parts.push((
            name.into(),
            MultipartPart::File(FilePart {
                source: FileSource::Path(path.into()),
                content_type: None,
            }),
        ));
        self
    }

    pub fn file_bytes<S1: Into<String>, S2: Into<String>>(
        mut self,
        name: S1,
        file_name: S2,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            MultipartPart::File(FilePart {
                source: FileSource::Bytes {
                    file_name: file_name.into(),
                    data,
                },
                content_type: None,
            }),
        ));
        self
    }

    /// Overrides the content type of the most recently added file part.
    pub fn content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        if let Some((_, MultipartPart::File(file))) = self
            .parts
            .iter_mut()
            .rev()
            .find(|(_, part)| matches!(part, MultipartPart::File(_)))
        {
            file.content_type = Some(content_type.into());
        }
        self
    }

    pub fn text<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.parts
            .push((name.into(), MultipartPart::Text(value.into())));
        self
    }

    /// Declares a part the form must carry. Checked when the descriptor is built.
    pub fn require_part<S: Into<String>>(mut self, name: S) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn parts(&self) -> &[(String, MultipartPart)] {
        &self.parts
    }

    fn check_required(&self) -> Result<()> {
        for required in &self.required {
            if !self.parts.iter().any(|(name, _)| name == required) {
                return Err(Error::MissingMultipartPart(required.clone()));
            }
        }
        Ok(())
    }
}

pub fn infer_content_type<S: AsRef<str>>(file_name: S) -> mime::Mime {
    let extension = Path::new(file_name.as_ref())
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => mime::APPLICATION_JSON,
        "csv" => mime::TEXT_CSV,
        "txt" => mime::TEXT_PLAIN,
        "xml" => mime::TEXT_XML,
        "html" | "htm" => mime::TEXT_HTML,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "pdf" => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// An immutable description of one HTTP request.
///
/// The URL, header values and query values may contain `{name}` placeholders
/// which [`RequestDescriptor::resolve`] expands from a [`FixtureStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    headers: Headers,
    query: Vec<(String, String)>,
    body: RequestBody,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn builder<S: Into<String>>(method: Method, url: S) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    pub fn get<S: Into<String>>(url: S) -> RequestBuilder {
        RequestBuilder::new(Method::Get, url)
    }

    pub fn post<S: Into<String>>(url: S) -> RequestBuilder {
        RequestBuilder::new(Method::Post, url)
    }

    pub fn put<S: Into<String>>(url: S) -> RequestBuilder {
        RequestBuilder::new(Method::Put, url)
    }

    pub fn delete<S: Into<String>>(url: S) -> RequestBuilder {
        RequestBuilder::new(Method::Delete, url)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Expands `{name}` placeholders in the URL, header values and query values.
    ///
    /// # Returns
    /// A new descriptor, or [`Error::FixtureNotFound`] for the first placeholder
    /// that has no fixture.
    pub fn resolve(&self, fixtures: &FixtureStore) -> Result<RequestDescriptor> {
        let mut headers = Headers::new();
        for (name, value) in self.headers.iter() {
            headers.insert(name, expand_placeholders(value, fixtures)?);
        }

        let query = self
            .query
            .iter()
            .map(|(key, value)| Ok((key.clone(), expand_placeholders(value, fixtures)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(RequestDescriptor {
            method: self.method,
            url: expand_placeholders(&self.url, fixtures)?,
            headers,
            query,
            body: self.body.clone(),
            timeout: self.timeout,
        })
    }
}

fn expand_placeholders(text: &str, fixtures: &FixtureStore) -> Result<String> {
    let mut missing = None;
    let expanded = PLACEHOLDER_REGEX.replace_all(text, |captures: &Captures| {
        match fixtures.render(&captures["fixture_name"]) {
            Ok(value) => value,
            Err(e) => {
                missing.get_or_insert(e);
                String::new()
            }
        }
    });

    match missing {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: Headers,
    query: Vec<(String, String)>,
    body: RequestBody,
    timeout: Option<Duration>,
    error: Option<Error>,
}

impl RequestBuilder {
    fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
            error: None,
        }
    }

    pub fn header<S1: AsRef<str>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        let value = value.into();
        if HeaderName::from_bytes(name.as_ref().as_bytes()).is_err() {
            self.error
                .get_or_insert_with(|| Error::InvalidHeaderName(name.as_ref().into()));
        } else if HeaderValue::from_str(&value).is_err() {
            self.error
                .get_or_insert_with(|| Error::InvalidHeaderValue(name.as_ref().into()));
        }
        self.headers.insert(name, value);
        self
    }

    /// Appends a query parameter. Repeated keys are kept in order.
    pub fn query<S1: Into<String>, S2: Into<String>>(mut self, key: S1, value: S2) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<RequestDescriptor> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.url.trim().is_empty() {
            return Err(Error::MalformedDescriptor("the URL is empty".into()));
        }
        if let RequestBody::Multipart(form) = &self.body {
            form.check_required()?;
        }

        Ok(RequestDescriptor {
            method: self.method,
            url: self.url,
            headers: self.headers,
            query: self.query,
            body: self.body,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("ProjectId", "42");

        assert_eq!(headers.get("projectid"), Some("42"));
        assert_eq!(headers.get("PROJECTID"), Some("42"));
        assert!(headers.contains("projectId"));
    }

    #[test]
    fn merged_headers_prefer_overrides() {
        let defaults: Headers = vec![("Accept", "application/json"), ("ProjectId", "1")]
            .into_iter()
            .collect();
        let overrides: Headers = vec![("projectid", "2")].into_iter().collect();

        let merged = defaults.merged_with(&overrides);

        assert_eq!(merged.get("ProjectId"), Some("2"));
        assert_eq!(merged.get("accept"), Some("application/json"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn repeated_query_keys_keep_their_order() {
        let descriptor = RequestDescriptor::get("/DatePart")
            .query("part", "year")
            .query("part", "month")
            .build()
            .unwrap();

        assert_eq!(
            descriptor.query(),
            &[
                ("part".to_string(), "year".to_string()),
                ("part".to_string(), "month".to_string())
            ]
        );
    }

    #[test]
    fn empty_url_is_rejected() {
        let result = RequestDescriptor::get("  ").build();

        assert!(matches!(result, Err(Error::MalformedDescriptor(_))));
    }

    #[test]
    fn invalid_header_name_is_rejected_at_build_time() {
        let result = RequestDescriptor::get("/LinkType")
            .header("bad header", "x")
            .build();

        assert!(matches!(result, Err(Error::InvalidHeaderName(name)) if name == "bad header"));
    }

    #[test]
    fn missing_required_multipart_part_is_rejected() {
        let form = MultipartForm::new()
            .text("folderId", "root")
            .require_part("file");

        let result = RequestDescriptor::post("/File/upload")
            .multipart(form)
            .build();

        assert!(matches!(result, Err(Error::MissingMultipartPart(name)) if name == "file"));
    }

    #[test]
    fn placeholders_are_resolved_from_fixtures() {
        let mut fixtures = FixtureStore::new();
        fixtures.set("linkTypeId", json!("6c1f0b4e-8a51-4a43-9d0e-3a1f7a0c2b11"));
        fixtures.set("projectId", json!(17));

        let descriptor = RequestDescriptor::get("/LinkType/{linkTypeId}")
            .header("ProjectId", "{projectId}")
            .query("id", "{linkTypeId}")
            .build()
            .unwrap()
            .resolve(&fixtures)
            .unwrap();

        assert_eq!(
            descriptor.url(),
            "/LinkType/6c1f0b4e-8a51-4a43-9d0e-3a1f7a0c2b11"
        );
        assert_eq!(descriptor.headers().get("projectid"), Some("17"));
        assert_eq!(descriptor.query()[0].1, "6c1f0b4e-8a51-4a43-9d0e-3a1f7a0c2b11");
    }

    #[test]
    fn unresolved_placeholder_fails_with_fixture_not_found() {
        let descriptor = RequestDescriptor::delete("/File/{fileId}").build().unwrap();

        let result = descriptor.resolve(&FixtureStore::new());

        assert!(matches!(result, Err(Error::FixtureNotFound(name)) if name == "fileId"));
    }

    #[test]
    fn content_type_is_inferred_from_extension() {
        assert_eq!(infer_content_type("report.CSV"), mime::TEXT_CSV);
        assert_eq!(infer_content_type("model.json"), mime::APPLICATION_JSON);
        assert_eq!(infer_content_type("blob"), mime::APPLICATION_OCTET_STREAM);

        let form = MultipartForm::new()
            .file_bytes("file", "data.bin", vec![1, 2, 3])
            .content_type("application/x-custom");
        match &form.parts()[0].1 {
            MultipartPart::File(file) => assert_eq!(file.content_type(), "application/x-custom"),
            MultipartPart::Text(_) => panic!("expected a file part"),
        }
    }
}
