use crate::{
    data::{
        FileSource, Headers, Method, MultipartForm, MultipartPart, RequestBody, RequestDescriptor,
    },
    envelope::ResponseEnvelope,
    error::{Error, Result},
    normalizer,
    stub_server::put_headers,
};
use async_trait::async_trait;
use hyper::HeaderMap;
use reqwest::multipart::{Form, Part};
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

/// Sends one request and normalizes whatever comes back.
///
/// Implementations never return `Err` for HTTP-level or network-level
/// failures; those become fields of the [`ResponseEnvelope`]. `Err` means the
/// request itself could not be assembled.
#[async_trait]
pub trait HttpClient: Debug {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub default_headers: Headers,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url_for(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.into());
        }

        match &self.config.base_url {
            Some(base_url) => Ok(format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                url.trim_start_matches('/')
            )),
            None => Err(Error::MalformedDescriptor(format!(
                "relative URL \"{}\" but no base URL is configured",
                url
            ))),
        }
    }

    async fn build_form(form: &MultipartForm) -> Result<Form> {
        let mut multipart = Form::new();

        for (name, part) in form.parts() {
            multipart = match part {
                MultipartPart::Text(value) => multipart.text(name.clone(), value.clone()),
                MultipartPart::File(file) => {
                    let data = match &file.source {
                        FileSource::Path(path) => tokio::fs::read(path).await?,
                        FileSource::Bytes { data, .. } => data.clone(),
                    };
                    let content_type = file.content_type();
                    let part = Part::bytes(data)
                        .file_name(file.file_name())
                        .mime_str(&content_type)
                        .map_err(|_| {
                            Error::MalformedDescriptor(format!(
                                "invalid content type \"{}\" for part \"{}\"",
                                content_type, name
                            ))
                        })?;
                    multipart.part(name.clone(), part)
                }
            };
        }

        Ok(multipart)
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope> {
        let url = self.url_for(request.url())?;
        let headers = self.config.default_headers.merged_with(request.headers());

        let mut header_map = HeaderMap::new();
        put_headers(&mut header_map, headers.iter())?;

        let mut request_builder = self
            .http
            .request(to_reqwest_method(request.method()), url.as_str())
            .headers(header_map);

        if !request.query().is_empty() {
            request_builder = request_builder.query(request.query());
        }

        request_builder = match request.body() {
            RequestBody::Empty => request_builder,
            RequestBody::Json(json) => request_builder.json(json),
            RequestBody::Multipart(form) => {
                request_builder.multipart(Self::build_form(form).await?)
            }
        };

        if let Some(timeout) = request.timeout().or(self.config.timeout) {
            request_builder = request_builder.timeout(timeout);
        }

        tracing::debug!(method = %request.method(), %url, "sending request");
        let started = Instant::now();

        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let envelope = normalizer::normalize_transport_error(&e, started.elapsed());
                tracing::warn!(
                    method = %request.method(),
                    %url,
                    error = %envelope,
                    "transport failure"
                );
                return Ok(envelope);
            }
        };

        let status_code = response.status().as_u16();
        let header_map = response.headers().clone();

        let envelope = match response.bytes().await {
            Ok(body) => {
                normalizer::normalize_response(status_code, &header_map, &body, started.elapsed())
            }
            Err(e) => normalizer::normalize_transport_error(&e, started.elapsed()),
        };

        tracing::debug!(
            method = %request.method(),
            %url,
            status = ?envelope.status_code(),
            elapsed_ms = envelope.elapsed().as_millis() as u64,
            "received response"
        );

        Ok(envelope)
    }
}
