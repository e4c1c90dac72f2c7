//! Async transport seam between the dispatcher and the network.
//!
//! A `Transport` executes one `HttpRequest` and hands back the raw
//! `HttpResponse`. It does not interpret status codes or bodies; that is the
//! client's job. A `TransportError` means no response could be read at all.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, UploadProgress};

/// Executes requests built by [`SimplestClient`](crate::SimplestClient).
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// Execute a multipart upload, reporting bytes sent on `progress` while
    /// the body is streamed. Transports that cannot observe the upload fall
    /// back to a plain `execute` and report nothing.
    fn upload(
        &self,
        request: HttpRequest,
        progress: mpsc::UnboundedSender<UploadProgress>,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        drop(progress);
        self.execute(request)
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).execute(request)
    }

    fn upload(
        &self,
        request: HttpRequest,
        progress: mpsc::UnboundedSender<UploadProgress>,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).upload(request, progress)
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use bytes::Bytes;
    use futures_util::StreamExt;
    use reqwest::multipart::{Form, Part};
    use tokio::sync::mpsc;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse, UploadProgress};

    /// Size of the slices a file body is streamed in. Progress is reported
    /// once per slice.
    const UPLOAD_CHUNK: usize = 64 * 1024;

    /// `Transport` backed by a shared `reqwest::Client`.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        http: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a preconfigured client (timeouts, proxies, user agent).
        pub fn with_client(http: reqwest::Client) -> Self {
            Self { http }
        }

        fn builder(
            &self,
            request: HttpRequest,
            progress: Option<mpsc::UnboundedSender<UploadProgress>>,
        ) -> Result<reqwest::RequestBuilder, TransportError> {
            let mut builder = match request.method {
                HttpMethod::Get => self.http.get(&request.url),
                HttpMethod::Post => self.http.post(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            Ok(match request.body {
                HttpBody::Empty => builder,
                HttpBody::Json(body) => builder.body(body),
                HttpBody::Multipart(parts) => builder.multipart(form(parts, progress)?),
            })
        }

        async fn send(&self, builder: reqwest::RequestBuilder) -> Result<HttpResponse, TransportError> {
            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();
            let body = response.text().await.map_err(|e| TransportError::Body(e.to_string()))?;
            Ok(HttpResponse { status, headers, body })
        }
    }

    fn form(
        parts: Vec<FormPart>,
        progress: Option<mpsc::UnboundedSender<UploadProgress>>,
    ) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let part = file_part(bytes, progress.clone())
                        .file_name(file_name)
                        .mime_str(&content_type)
                        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }

    fn file_part(bytes: Vec<u8>, progress: Option<mpsc::UnboundedSender<UploadProgress>>) -> Part {
        let Some(progress) = progress else {
            return Part::bytes(bytes);
        };
        let total = bytes.len() as u64;
        let chunks: Vec<Bytes> = bytes.chunks(UPLOAD_CHUNK).map(Bytes::copy_from_slice).collect();
        let mut loaded = 0u64;
        let stream = futures_util::stream::iter(chunks).map(move |chunk| {
            loaded += chunk.len() as u64;
            // The receiver is gone once the dispatcher stops listening.
            let _ = progress.send(UploadProgress {
                loaded,
                total: Some(total),
            });
            Ok::<_, std::io::Error>(chunk)
        });
        Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
    }

    impl Transport for ReqwestTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let builder = self.builder(request, None)?;
            self.send(builder).await
        }

        async fn upload(
            &self,
            request: HttpRequest,
            progress: mpsc::UnboundedSender<UploadProgress>,
        ) -> Result<HttpResponse, TransportError> {
            let builder = self.builder(request, Some(progress))?;
            self.send(builder).await
        }
    }
}
