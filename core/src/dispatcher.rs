//! Async dispatcher: one call in, one classified result out.
//!
//! # Design
//! Every API call goes through `send`: fill in the session id, build the
//! request, hand it to the `Transport`, classify what comes back. There are
//! no retries and no timeouts here; a call is one attempt and the caller
//! decides what to do with a failure.
//!
//! The auth calls (register, login, profile, profile update, password
//! change, forgot password) also write the returned user into the
//! `SessionStore`, tagged with the action, and `logout` clears it without a
//! round-trip. Site lookups cache the site record and publish it on their
//! own watch channel.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use crate::client::{http_build_query, SimplestClient};
use crate::config::SimplestConfig;
use crate::domain::root_domain;
use crate::error::ApiError;
use crate::http::UploadProgress;
use crate::session::SessionStore;
use crate::storage::{CookieJar, KeyValueStore, MemoryCookieJar, MemoryStore};
use crate::thumbnail::{thumbnail_url, ThumbnailOptions};
use crate::transport::Transport;
use crate::types::{FileCreateOptions, LocalFile, Request, User, UserAction};

/// Local storage key of the cached site record.
pub const SITE_KEY: &str = "_site";

#[derive(Debug)]
pub struct Dispatcher<T> {
    config: SimplestConfig,
    client: SimplestClient,
    transport: T,
    session: SessionStore,
    store: Arc<dyn KeyValueStore>,
    site: watch::Sender<Option<Value>>,
}

impl<T: Transport> Dispatcher<T> {
    /// Dispatcher with in-memory storage; nothing survives the process.
    pub fn new(config: SimplestConfig, transport: T) -> Self {
        Self::with_storage(config, transport, Arc::new(MemoryStore::new()), Arc::new(MemoryCookieJar::new()))
    }

    /// Dispatcher persisting through `store` and `jar`. Which of the two
    /// holds the session is decided by the config, once.
    pub fn with_storage(
        config: SimplestConfig,
        transport: T,
        store: Arc<dyn KeyValueStore>,
        jar: Arc<dyn CookieJar>,
    ) -> Self {
        let session = SessionStore::from_config(&config, store.clone(), jar);
        let (site, _) = watch::channel(None);
        Self {
            client: SimplestClient::new(&config.backend_url),
            config,
            transport,
            session,
            store,
            site,
        }
    }

    pub fn config(&self) -> &SimplestConfig {
        &self.config
    }

    pub fn client(&self) -> &SimplestClient {
        &self.client
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `request` as it will be sent: with the logged-in user's session id
    /// when the caller did not provide one.
    pub fn prepare(&self, request: &Request) -> Request {
        let current = if self.session.is_logged_in() {
            self.session.current_session_id()
        } else {
            None
        };
        request.with_default_session(current)
    }

    pub async fn send(&self, request: &Request) -> Result<Value, ApiError> {
        let request = self.prepare(request);
        let http = self.client.build_post(&request)?;
        if request.is_debug() {
            let query = serde_json::to_value(&request)
                .ok()
                .and_then(|v| v.as_object().and_then(http_build_query))
                .unwrap_or_default();
            tracing::debug!(url = %format!("{}?{query}", http.url), "debug request");
        }
        tracing::debug!(run = %request.run, "dispatching");

        let response = match self.transport.execute(http).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(run = %request.run, error = %e, "transport failed");
                return Err(e.into());
            }
        };
        let result = self.client.parse_post(response);
        if let Err(ApiError::NotServer { cause }) = &result {
            tracing::warn!(run = %request.run, %cause, "response is not from the backend");
        }
        result
    }

    /// Shorthand for `send` with a field map.
    pub async fn call(&self, run: &str, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.send(&Request::from_fields(run, fields)).await
    }

    async fn send_and_save(&self, action: UserAction, request: Request) -> Result<User, ApiError> {
        let user = match self.send(&request).await? {
            Value::Object(map) => User(map),
            other => return Err(ApiError::UnexpectedResponse(other)),
        };
        self.session.save(action, Some(user.clone()));
        Ok(user)
    }

    pub async fn register(&self, user: Map<String, Value>) -> Result<User, ApiError> {
        self.send_and_save(UserAction::Register, Request::from_fields("user.register", user))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = Request::new("user.login")
            .field("email", email)
            .field("password", password);
        self.send_and_save(UserAction::Login, request).await
    }

    /// Forget the session locally. The backend is not contacted.
    pub fn logout(&self) {
        self.session.save(UserAction::Logout, None);
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.send_and_save(UserAction::Profile, Request::new("user.profile"))
            .await
    }

    pub async fn profile_update(&self, user: Map<String, Value>) -> Result<User, ApiError> {
        self.send_and_save(UserAction::ProfileUpdate, Request::from_fields("user.update", user))
            .await
    }

    pub async fn password_change(&self, old_password: &str, new_password: &str) -> Result<User, ApiError> {
        let request = Request::new("user.password-change")
            .field("old_password", old_password)
            .field("new_password", new_password);
        self.send_and_save(UserAction::PasswordChange, request).await
    }

    pub async fn forgot_password(&self, fields: Map<String, Value>) -> Result<User, ApiError> {
        self.send_and_save(
            UserAction::ForgotPassword,
            Request::from_fields("user.forgot-password", fields),
        )
        .await
    }

    /// Upload the first of `files`. `on_progress` receives percentages
    /// (0 to 100) while the body is sent; the returned value is the file
    /// record or the failure.
    pub async fn file_upload<F>(
        &self,
        files: &[LocalFile],
        options: &FileCreateOptions,
        mut on_progress: F,
    ) -> Result<Value, ApiError>
    where
        F: FnMut(u8),
    {
        let mut options = options.clone();
        if options.session_id.is_none() && self.session.is_logged_in() {
            options.session_id = self.session.current_session_id();
        }
        let request = self.client.build_upload(files, &options)?;
        tracing::debug!(file = %files[0].name, size = files[0].bytes.len(), "uploading");

        let (tx, mut rx) = mpsc::unbounded_channel::<UploadProgress>();
        let upload = self.transport.upload(request, tx);
        tokio::pin!(upload);
        let outcome = loop {
            tokio::select! {
                biased;
                Some(progress) = rx.recv() => {
                    if let Some(pct) = progress.percentage() {
                        on_progress(pct);
                    }
                }
                outcome = &mut upload => break outcome,
            }
        };
        while let Ok(progress) = rx.try_recv() {
            if let Some(pct) = progress.percentage() {
                on_progress(pct);
            }
        }

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "upload transport failed");
                return Err(e.into());
            }
        };
        self.client.parse_post(response)
    }

    /// Raw HTML fragment rendered by the backend for a site.
    pub async fn html(&self, run: &str, idx_site: &str) -> Result<String, ApiError> {
        let http = self.client.build_html(run, idx_site)?;
        let response = self.transport.execute(http).await?;
        self.client.parse_html(response)
    }

    /// The site record saved by the last successful `site`/`site_update`,
    /// from local storage. Lets a UI paint before the network answers.
    pub fn cached_site(&self) -> Option<Value> {
        match self.store.get(SITE_KEY) {
            Ok(raw) => raw.and_then(|raw| serde_json::from_str(&raw).ok()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read site cache");
                None
            }
        }
    }

    /// Latest site record seen in this process, else the cached one.
    pub fn site_settings(&self) -> Option<Value> {
        self.site.borrow().clone().or_else(|| self.cached_site())
    }

    /// Feed of site changes. A new receiver immediately sees the latest.
    pub fn subscribe_site(&self) -> watch::Receiver<Option<Value>> {
        self.site.subscribe()
    }

    fn remember_site(&self, site: &Value) {
        if let Err(e) = self.store.set(SITE_KEY, &site.to_string()) {
            tracing::warn!(error = %e, "failed to cache site");
        }
        self.site.send_replace(Some(site.clone()));
    }

    /// Load a site by idx or domain and make it the current site.
    pub async fn site(&self, idx_site_or_domain: &str) -> Result<Value, ApiError> {
        let request = Request::new("site.get").field("idx_site_or_domain", idx_site_or_domain);
        let site = self.send(&request).await?;
        self.remember_site(&site);
        Ok(site)
    }

    pub async fn site_update(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        let site = self.call("site.update", fields).await?;
        self.remember_site(&site);
        Ok(site)
    }

    pub fn current_domain(&self) -> &str {
        &self.config.hostname
    }

    pub fn current_root_domain(&self) -> String {
        root_domain(&self.config.hostname)
    }

    /// Thumbnail URL for an uploaded image; see [`thumbnail_url`].
    pub fn thumbnail_url(&self, source: &Value, options: &ThumbnailOptions) -> String {
        thumbnail_url(&self.config.backend_home_url(), source, options)
    }
}
