//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `SimplestClient` builds an
//! `HttpRequest` and parses an `HttpResponse`; whoever holds the network
//! (a `Transport`, or a host application driving the client by hand) moves
//! bytes in between. Multipart bodies are kept as a list of parts rather
//! than encoded bytes so each transport can stream the file part and report
//! upload progress.

/// HTTP method for a request. The API only ever uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One field of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    Empty,
    Json(String),
    Multipart(Vec<FormPart>),
}

/// An HTTP request described as plain data. `url` is absolute and already
/// carries any query string.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: HttpBody,
}

impl HttpRequest {
    /// Value of a multipart text field, if the body is multipart and has it.
    pub fn form_text(&self, field: &str) -> Option<&str> {
        let HttpBody::Multipart(parts) = &self.body else {
            return None;
        };
        parts.iter().find_map(|part| match part {
            FormPart::Text { name, value } if name == field => Some(value.as_str()),
            _ => None,
        })
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw upload progress as reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    /// `None` when the total size is unknown.
    pub total: Option<u64>,
}

impl UploadProgress {
    /// Rounded percentage in `0..=100`, or `None` when the ratio is not a
    /// number (unknown or zero total).
    pub fn percentage(&self) -> Option<u8> {
        let total = self.total.filter(|t| *t > 0)?;
        let pct = (self.loaded as f64 * 100.0 / total as f64).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}
