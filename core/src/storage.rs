//! Persistence primitives the session store writes through.
//!
//! # Design
//! Two kinds of storage exist on the client side: origin-scoped key/value
//! storage and a cookie jar. Both are traits so a host can plug in its own
//! (a webview bridge, a keychain, reqwest's cookie store). In-memory and
//! file-backed implementations are provided for native clients and tests.
//!
//! All methods take `&self`; implementations guard their state internally.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cookie::Cookie;

use crate::domain::domain_matches;

/// Origin-scoped string storage keyed by name.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Cookie storage with domain scoping.
pub trait CookieJar: Send + Sync + Debug {
    /// The cookie called `name` visible to `host`. When several match, the
    /// one with the most specific domain wins.
    fn get(&self, name: &str, host: &str) -> io::Result<Option<Cookie<'static>>>;

    /// Store `cookie`, replacing any cookie with the same name, domain and
    /// path.
    fn set(&self, cookie: Cookie<'static>) -> io::Result<()>;

    /// Expire the cookie called `name` scoped to `domain`.
    fn remove(&self, name: &str, domain: &str) -> io::Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// One file per key under a directory. Keys are sanitized to
/// `[A-Za-z0-9_-]` before they become file names.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn same_slot(a: &Cookie<'_>, b: &Cookie<'_>) -> bool {
    a.name() == b.name() && domain_of(a) == domain_of(b) && a.path() == b.path()
}

fn domain_of<'a>(cookie: &'a Cookie<'_>) -> &'a str {
    cookie.domain().unwrap_or("").trim_start_matches('.')
}

fn find_visible(cookies: &[Cookie<'static>], name: &str, host: &str) -> Option<Cookie<'static>> {
    cookies
        .iter()
        .filter(|c| c.name() == name)
        .filter(|c| c.domain().map_or(true, |d| domain_matches(d, host)))
        .max_by_key(|c| domain_of(c).len())
        .cloned()
}

#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<Cookie<'static>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str, host: &str) -> io::Result<Option<Cookie<'static>>> {
        Ok(find_visible(&lock(&self.cookies), name, host))
    }

    fn set(&self, cookie: Cookie<'static>) -> io::Result<()> {
        let mut cookies = lock(&self.cookies);
        cookies.retain(|c| !same_slot(c, &cookie));
        cookies.push(cookie);
        Ok(())
    }

    fn remove(&self, name: &str, domain: &str) -> io::Result<()> {
        let domain = domain.trim_start_matches('.');
        lock(&self.cookies).retain(|c| !(c.name() == name && domain_of(c) == domain));
        Ok(())
    }
}

/// Cookie jar persisted as percent-encoded `Set-Cookie` lines in one file.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileCookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> io::Result<Vec<Cookie<'static>>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match Cookie::parse_encoded(line.to_string()) {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "skipping unparseable cookie line");
                    None
                }
            })
            .collect())
    }

    fn write_all(&self, cookies: &[Cookie<'static>]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        for cookie in cookies {
            out.push_str(&cookie.encoded().to_string());
            out.push('\n');
        }
        std::fs::write(&self.path, out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str, host: &str) -> io::Result<Option<Cookie<'static>>> {
        let _guard = lock(&self.guard);
        Ok(find_visible(&self.read_all()?, name, host))
    }

    fn set(&self, cookie: Cookie<'static>) -> io::Result<()> {
        let _guard = lock(&self.guard);
        let mut cookies = self.read_all()?;
        cookies.retain(|c| !same_slot(c, &cookie));
        cookies.push(cookie);
        self.write_all(&cookies)
    }

    fn remove(&self, name: &str, domain: &str) -> io::Result<()> {
        let _guard = lock(&self.guard);
        let domain = domain.trim_start_matches('.');
        let mut cookies = self.read_all()?;
        cookies.retain(|c| !(c.name() == name && domain_of(c) == domain));
        self.write_all(&cookies)
    }
}
