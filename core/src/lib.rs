//! Client SDK for the Simplest API.
//!
//! # Overview
//! The backend exposes a single endpoint. Every operation is a POST whose
//! JSON body names the action in a `run` field (`"post.create"`,
//! `"user.login"`, ...), and failures come back in-band as
//! `{error_code, error_message}` with HTTP 200.
//!
//! # Design
//! - `SimplestClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `Dispatcher` drives the client through a `Transport`, attaches the
//!   session id of the logged-in user, and records logins in the
//!   `SessionStore`.
//! - `SessionStore` keeps the user record in origin-scoped storage or in a
//!   root-domain cookie, chosen once from `SimplestConfig`.
//! - `classify` holds the success/error rules every response goes through.

pub mod api;
pub mod classify;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;
pub mod thumbnail;
pub mod transport;
pub mod types;

pub use classify::{is_error_response, is_success_response, make_error};
pub use client::{http_build_query, SimplestClient};
pub use config::{ConfigError, SimplestConfig};
pub use dispatcher::Dispatcher;
pub use domain::{cookie_domain, root_domain};
pub use error::{ApiError, ErrorObject, TransportError};
pub use http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse, UploadProgress};
pub use session::{CookieSession, LocalSession, SessionBackend, SessionStore};
pub use storage::{CookieJar, FileCookieJar, FileStore, KeyValueStore, MemoryCookieJar, MemoryStore};
pub use thumbnail::{post_photo_url, thumbnail_url, ThumbnailMode, ThumbnailOptions};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use types::{FileCreateOptions, LocalFile, Request, User, UserAction, UserEvent};
