//! Stateless HTTP request builder and response parser for the Simplest API.
//!
//! # Design
//! `SimplestClient` holds only the endpoint URL. Every call is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The caller executes the round-trip in
//! between, so this layer stays deterministic and free of I/O. The async
//! `Dispatcher` drives it through a `Transport`; a host with its own HTTP
//! stack can drive it directly.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::classify::{classify, to_error_object};
use crate::error::ApiError;
use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{FileCreateOptions, LocalFile, Request};

const MAX_LOGGED_BODY: usize = 200;

/// Synchronous, stateless client for the single API endpoint.
#[derive(Debug, Clone)]
pub struct SimplestClient {
    backend_url: String,
}

impl SimplestClient {
    pub fn new(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim().to_string(),
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    fn endpoint(&self) -> Result<&str, ApiError> {
        if self.backend_url.is_empty() {
            return Err(ApiError::NoBackendUrl);
        }
        Ok(&self.backend_url)
    }

    /// JSON POST of `request` to the endpoint.
    pub fn build_post(&self, request: &Request) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint()?;
        let body = serde_json::to_string(request).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: HttpBody::Json(body),
        })
    }

    /// GET for a raw HTML fragment rendered by `html.<run>` for a site.
    pub fn build_html(&self, run: &str, idx_site: &str) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint()?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("run", &format!("html.{run}"))
            .append_pair("idx_site", idx_site)
            .finish();
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: format!("{url}{separator}{query}"),
            headers: Vec::new(),
            body: HttpBody::Empty,
        })
    }

    /// Multipart upload of the first of `files`. Only the options that are
    /// set become form fields.
    pub fn build_upload(&self, files: &[LocalFile], options: &FileCreateOptions) -> Result<HttpRequest, ApiError> {
        let file = files.first().ok_or(ApiError::NoFileSelected)?;
        let url = self.endpoint()?;

        let mut parts = vec![
            text_part("run", "file.upload"),
            FormPart::File {
                name: "file".to_string(),
                file_name: file.name.clone(),
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            },
        ];
        let optional = [
            ("taxonomy", &options.taxonomy),
            ("relation", &options.relation),
            ("code", &options.code),
            ("session_id", &options.session_id),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                parts.push(text_part(name, value));
            }
        }

        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: Vec::new(),
            body: HttpBody::Multipart(parts),
        })
    }

    /// Classify a JSON response. The HTTP status only matters when the body
    /// is not an error envelope: a non-2xx status or an unparseable body is
    /// then a `NotServer` failure.
    pub fn parse_post(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let parsed = serde_json::from_str::<Value>(&response.body);
        if !response.is_success() {
            if let Some(err) = parsed.as_ref().ok().and_then(to_error_object) {
                return Err(ApiError::Backend(err));
            }
            return Err(ApiError::NotServer {
                cause: format!("HTTP {}: {}", response.status, excerpt(&response.body)),
            });
        }
        let value = parsed.map_err(|e| ApiError::NotServer {
            cause: format!("invalid JSON ({e}): {}", excerpt(&response.body)),
        })?;
        classify(value)
    }

    pub fn parse_html(&self, response: HttpResponse) -> Result<String, ApiError> {
        if !response.is_success() {
            return Err(ApiError::NotServer {
                cause: format!("HTTP {}: {}", response.status, excerpt(&response.body)),
            });
        }
        Ok(response.body)
    }
}

fn text_part(name: &str, value: &str) -> FormPart {
    FormPart::Text {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// URL-encode a field map as a query string. `None` for an empty map.
/// Non-string values are written as their JSON text.
pub fn http_build_query(params: &Map<String, Value>) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            Value::String(s) => serializer.append_pair(key, s),
            other => serializer.append_pair(key, &other.to_string()),
        };
    }
    Some(serializer.finish())
}
