//! Session store: the last known authenticated user, persisted across runs.
//!
//! # Design
//! Where the record lives is decided once, when the store is built:
//! `LocalSession` keeps it in origin-scoped key/value storage and
//! `CookieSession` keeps it in a cookie on the root domain so every
//! subdomain of a site sees the same login. Both sit behind
//! `SessionBackend`, and nothing above this module branches on the choice.
//!
//! Reads never fail. A missing, unreadable or unparseable record is simply
//! "not logged in".
//!
//! Writes are last-writer-wins. A slow `user.profile` response that lands
//! after a newer login overwrites it; there is no sequencing token.

use std::fmt::Debug;
use std::io;
use std::sync::Arc;

use cookie::Cookie;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::SimplestConfig;
use crate::domain::cookie_domain;
use crate::storage::{CookieJar, KeyValueStore};
use crate::types::{value_as_text, User, UserAction, UserEvent};

/// Storage key (and cookie name) of the user record.
pub const USER_KEY: &str = "_user";

/// Where the serialized user record is kept.
pub trait SessionBackend: Send + Sync + Debug {
    /// Store `serialized`, or clear the record when `None`.
    fn write(&self, serialized: Option<&str>) -> io::Result<()>;
    fn read(&self) -> io::Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct LocalSession {
    store: Arc<dyn KeyValueStore>,
}

impl LocalSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl SessionBackend for LocalSession {
    fn write(&self, serialized: Option<&str>) -> io::Result<()> {
        match serialized {
            Some(value) => self.store.set(USER_KEY, value),
            None => self.store.remove(USER_KEY),
        }
    }

    fn read(&self) -> io::Result<Option<String>> {
        self.store.get(USER_KEY)
    }
}

/// Session kept in a permanent cookie with path `/` on the root domain of
/// `hostname`.
#[derive(Debug, Clone)]
pub struct CookieSession {
    jar: Arc<dyn CookieJar>,
    hostname: String,
}

impl CookieSession {
    pub fn new(jar: Arc<dyn CookieJar>, hostname: impl Into<String>) -> Self {
        Self {
            jar,
            hostname: hostname.into(),
        }
    }

    pub fn cookie_domain(&self) -> String {
        cookie_domain(&self.hostname)
    }
}

impl SessionBackend for CookieSession {
    fn write(&self, serialized: Option<&str>) -> io::Result<()> {
        let domain = self.cookie_domain();
        match serialized {
            Some(value) => {
                let cookie = Cookie::build((USER_KEY, value.to_string()))
                    .domain(domain)
                    .path("/")
                    .permanent()
                    .build();
                self.jar.set(cookie)
            }
            None => self.jar.remove(USER_KEY, &domain),
        }
    }

    fn read(&self) -> io::Result<Option<String>> {
        Ok(self
            .jar
            .get(USER_KEY, &self.hostname)?
            .map(|cookie| cookie.value().to_string()))
    }
}

/// The current user, its persistence, and a change feed for observers.
#[derive(Debug)]
pub struct SessionStore {
    backend: Box<dyn SessionBackend>,
    events: watch::Sender<Option<UserEvent>>,
}

impl SessionStore {
    pub fn new(backend: impl SessionBackend + 'static) -> Self {
        let (events, _) = watch::channel(None);
        Self {
            backend: Box::new(backend),
            events,
        }
    }

    pub fn local(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(LocalSession::new(store))
    }

    pub fn cookie(jar: Arc<dyn CookieJar>, hostname: &str) -> Self {
        Self::new(CookieSession::new(jar, hostname))
    }

    /// Pick the backend named by `enable_login_to_all_subdomains`.
    pub fn from_config(
        config: &SimplestConfig,
        store: Arc<dyn KeyValueStore>,
        jar: Arc<dyn CookieJar>,
    ) -> Self {
        if config.enable_login_to_all_subdomains {
            Self::cookie(jar, &config.hostname)
        } else {
            Self::local(store)
        }
    }

    /// Persist `user` (or clear it with `None`) and tell subscribers which
    /// action caused the change.
    pub fn save(&self, action: UserAction, user: Option<User>) {
        let written = match &user {
            Some(user) => match serde_json::to_string(user) {
                Ok(json) => self.backend.write(Some(&json)),
                Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            },
            None => self.backend.write(None),
        };
        if let Err(e) = written {
            tracing::warn!(action = action.as_str(), error = %e, "failed to persist session");
        }
        tracing::info!(action = action.as_str(), logged_in = user.is_some(), "session changed");
        self.events.send_replace(Some(UserEvent { action, user }));
    }

    fn load_value(&self) -> Option<Value> {
        let raw = match self.backend.read() {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "stored session is not valid JSON");
                None
            }
        }
    }

    /// The stored record decoded as `T`, or `None` if nothing usable is
    /// stored.
    pub fn load<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.load_value()?).ok()
    }

    /// One field of the stored record. Missing and `null` fields are `None`.
    pub fn load_field(&self, field: &str) -> Option<Value> {
        match self.load_value()? {
            Value::Object(mut map) => map.remove(field).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    fn load_text(&self, field: &str) -> Option<String> {
        value_as_text(&self.load_field(field)?)
    }

    /// The stored user, or an empty record when logged out. Never fails.
    pub fn current_user(&self) -> User {
        self.load().unwrap_or_default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_session_id().is_some_and(|s| !s.is_empty())
    }

    pub fn current_id(&self) -> Option<String> {
        self.load_text("idx")
    }

    pub fn current_nickname(&self) -> Option<String> {
        self.load_text("nickname")
    }

    pub fn current_name(&self) -> Option<String> {
        self.load_text("name")
    }

    pub fn current_email(&self) -> Option<String> {
        self.load_text("email")
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.load_text("session_id")
    }

    /// Feed of session changes. A new receiver immediately sees the latest
    /// event, or `None` if nothing was saved yet.
    pub fn subscribe(&self) -> watch::Receiver<Option<UserEvent>> {
        self.events.subscribe()
    }

    pub fn last_event(&self) -> Option<UserEvent> {
        self.events.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::{MemoryCookieJar, MemoryStore};

    fn user(value: Value) -> User {
        serde_json::from_value(value).unwrap()
    }

    fn stores() -> Vec<(&'static str, SessionStore)> {
        vec![
            ("local", SessionStore::local(Arc::new(MemoryStore::new()))),
            ("cookie", SessionStore::cookie(Arc::new(MemoryCookieJar::new()), "www.abc.com")),
        ]
    }

    #[test]
    fn save_then_load_returns_same_record() {
        for (name, store) in stores() {
            let record = user(json!({
                "idx": "1",
                "session_id": "s1",
                "nickname": "nick; with=specials",
                "photo": {"url": "http://x/files/a.jpg"},
                "level": 3
            }));
            store.save(UserAction::Login, Some(record.clone()));
            assert_eq!(store.load::<User>(), Some(record), "{name}");
        }
    }

    #[test]
    fn logged_in_follows_session_id() {
        for (name, store) in stores() {
            assert!(!store.is_logged_in(), "{name}: fresh store");
            store.save(UserAction::Login, Some(user(json!({"idx": "1", "session_id": "s1"}))));
            assert!(store.is_logged_in(), "{name}: after login");
            store.save(UserAction::Logout, None);
            assert!(!store.is_logged_in(), "{name}: after logout");
            assert_eq!(store.load::<User>(), None, "{name}");
        }
    }

    #[test]
    fn empty_session_id_is_not_logged_in() {
        let store = SessionStore::local(Arc::new(MemoryStore::new()));
        store.save(UserAction::Profile, Some(user(json!({"idx": "1", "session_id": ""}))));
        assert!(!store.is_logged_in());
    }

    #[test]
    fn field_accessors() {
        let store = SessionStore::local(Arc::new(MemoryStore::new()));
        store.save(
            UserAction::Register,
            Some(user(json!({
                "idx": 7,
                "session_id": "abc",
                "nickname": "nick",
                "name": "Name",
                "email": "a@b.c",
                "gender": null
            }))),
        );
        assert_eq!(store.current_id().as_deref(), Some("7"));
        assert_eq!(store.current_session_id().as_deref(), Some("abc"));
        assert_eq!(store.current_nickname().as_deref(), Some("nick"));
        assert_eq!(store.current_name().as_deref(), Some("Name"));
        assert_eq!(store.current_email().as_deref(), Some("a@b.c"));
        assert_eq!(store.load_field("gender"), None);
        assert_eq!(store.load_field("missing"), None);
    }

    #[test]
    fn current_user_is_empty_when_logged_out() {
        let store = SessionStore::local(Arc::new(MemoryStore::new()));
        let current = store.current_user();
        assert!(current.is_empty());
        assert_eq!(current.idx(), None);
    }

    #[test]
    fn corrupt_record_degrades_to_logged_out() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(USER_KEY, "{not json").unwrap();
        let store = SessionStore::local(kv.clone());
        assert!(!store.is_logged_in());
        assert_eq!(store.load::<User>(), None);
        assert!(store.current_user().is_empty());

        kv.set(USER_KEY, "null").unwrap();
        assert_eq!(store.load::<User>(), None);
    }

    #[test]
    fn cookie_session_is_shared_across_subdomains() {
        let jar: Arc<dyn CookieJar> = Arc::new(MemoryCookieJar::new());
        let www = SessionStore::cookie(jar.clone(), "www.abc.co.kr");
        let blog = SessionStore::cookie(jar.clone(), "blog.abc.co.kr");
        let other = SessionStore::cookie(jar, "www.other.co.kr");

        www.save(UserAction::Login, Some(user(json!({"idx": "1", "session_id": "s1"}))));
        assert_eq!(blog.current_session_id().as_deref(), Some("s1"));
        assert!(!other.is_logged_in());

        blog.save(UserAction::Logout, None);
        assert!(!www.is_logged_in());
    }

    #[test]
    fn cookie_is_scoped_to_root_domain() {
        let jar = Arc::new(MemoryCookieJar::new());
        let session = CookieSession::new(jar.clone(), "www.abc.com");
        assert_eq!(session.cookie_domain(), ".abc.com");
        session.write(Some("{}")).unwrap();
        let cookie = jar.get(USER_KEY, "abc.com").unwrap().unwrap();
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.max_age().is_some());
    }

    #[test]
    fn localhost_cookie_domain_is_bare() {
        let session = CookieSession::new(Arc::new(MemoryCookieJar::new()), "localhost");
        assert_eq!(session.cookie_domain(), "localhost");
        session.write(Some(r#"{"session_id":"s"}"#)).unwrap();
        assert_eq!(session.read().unwrap().as_deref(), Some(r#"{"session_id":"s"}"#));
    }

    #[test]
    fn from_config_selects_backend() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let jar: Arc<dyn CookieJar> = Arc::new(MemoryCookieJar::new());

        let config = SimplestConfig::new("http://x/api.php").with_login_to_all_subdomains("www.abc.com");
        let store = SessionStore::from_config(&config, kv.clone(), jar.clone());
        store.save(UserAction::Login, Some(user(json!({"session_id": "c"}))));
        assert!(jar.get(USER_KEY, "www.abc.com").unwrap().is_some());
        assert!(kv.get(USER_KEY).unwrap().is_none());

        let config = SimplestConfig::new("http://x/api.php");
        let store = SessionStore::from_config(&config, kv.clone(), jar);
        store.save(UserAction::Login, Some(user(json!({"session_id": "l"}))));
        assert!(kv.get(USER_KEY).unwrap().is_some());
    }

    #[test]
    fn subscribers_see_tagged_events_and_late_replay() {
        let store = SessionStore::local(Arc::new(MemoryStore::new()));
        let early = store.subscribe();
        assert_eq!(*early.borrow(), None);

        store.save(UserAction::Login, Some(user(json!({"session_id": "s1"}))));
        store.save(UserAction::ProfileUpdate, Some(user(json!({"session_id": "s1", "name": "n"}))));

        let late = store.subscribe();
        let event = late.borrow().clone().unwrap();
        assert_eq!(event.action, UserAction::ProfileUpdate);
        assert_eq!(event.user.unwrap().text("name").as_deref(), Some("n"));

        store.save(UserAction::Logout, None);
        let event = store.last_event().unwrap();
        assert_eq!(event.action, UserAction::Logout);
        assert!(event.user.is_none());
        assert!(early.has_changed().unwrap());
    }
}
