//! # Response Cache Module
//!
//! Read-through / write-through caching of dispatched responses.
//!
//! ## Overview
//!
//! The dispatcher consults an optional [`ResponseCache`] before running any
//! controller and stores the final response afterwards. Entries are keyed by
//! a [`Fingerprint`] of the request: method, URI and any configured "vary"
//! headers, hashed with SHA-256.
//!
//! Backends report failures as [`BackendError`]; the dispatcher logs them and
//! carries on as if the cache had missed. A broken cache never fails a
//! request.
//!
//! ## Cacheability
//!
//! [`cache_lifetime`] decides whether and for how long a response is stored:
//!
//! - only `GET` and `HEAD` requests are cached
//! - `Cache-Control: no-store`, `no-cache` or `private` on the response
//!   disables storing
//! - `max-age=N` overrides the configured lifetime (`max-age=0` disables)
//! - lifetimes are capped at [`MAX_CACHE_LIFETIME`] (2^31 seconds)
//!
//! ## Backends
//!
//! [`MemoryCache`] is a bounded in-process LRU with per-entry expiry. Values
//! are stored as serialized JSON, the same representation an external store
//! would use.

use http::Method;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::BackendError;
use crate::request::Request;
use crate::response::Response;

/// Longest lifetime any response is cached for.
pub const MAX_CACHE_LIFETIME: Duration = Duration::from_secs(1 << 31);

/// Deterministic cache key derived from request identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash method, URI and the values of the `vary` headers (in the given order).
    #[must_use]
    pub fn for_request(request: &Request, vary: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(request.uri.as_bytes());
        for name in vary {
            hasher.update(b"\n");
            hasher.update(name.to_ascii_lowercase().as_bytes());
            hasher.update(b":");
            if let Some(value) = request.get_header(name) {
                hasher.update(value.as_bytes());
            }
        }
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage backend for dispatched responses.
pub trait ResponseCache: Send + Sync {
    /// Look up a response. `Ok(None)` is a miss.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot be queried.
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Response>, BackendError>;

    /// Store `response` for `lifetime`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot store the entry.
    fn put(
        &self,
        fingerprint: &Fingerprint,
        response: &Response,
        lifetime: Duration,
    ) -> Result<(), BackendError>;
}

/// How long `response` to `request` may be cached, or `None` if it must not be.
#[must_use]
pub fn cache_lifetime(request: &Request, response: &Response, default: Duration) -> Option<Duration> {
    if request.method != Method::GET && request.method != Method::HEAD {
        return None;
    }

    let mut lifetime = default;
    if let Some(cache_control) = response.get_header("cache-control") {
        for directive in cache_control.split(',').map(|d| d.trim().to_ascii_lowercase()) {
            match directive.as_str() {
                "no-store" | "no-cache" | "private" => return None,
                _ => {
                    if let Some(secs) = directive
                        .strip_prefix("max-age=")
                        .and_then(|v| v.trim_matches('"').parse::<u64>().ok())
                    {
                        lifetime = Duration::from_secs(secs);
                    }
                }
            }
        }
    }

    (!lifetime.is_zero()).then_some(lifetime.min(MAX_CACHE_LIFETIME))
}

struct CachedEntry {
    payload: String,
    expires_at: Instant,
}

/// Bounded in-memory LRU cache with per-entry expiry.
pub struct MemoryCache {
    // LruCache::get() needs &mut for recency updates, so a Mutex rather than RwLock
    entries: Mutex<LruCache<Fingerprint, CachedEntry>>,
}

impl MemoryCache {
    /// Cache holding at most `capacity` responses (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<Fingerprint, CachedEntry>>, BackendError> {
        self.entries
            .lock()
            .map_err(|_| BackendError::Unavailable("memory cache lock poisoned".to_string()))
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, fingerprint: &Fingerprint) -> bool {
        self.lock()
            .map(|mut e| e.pop(fingerprint).is_some())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.lock() {
            entries.clear();
        }
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Response>, BackendError> {
        let mut entries = self.lock()?;
        let expired = match entries.get(fingerprint) {
            None => return Ok(None),
            Some(entry) if entry.expires_at <= Instant::now() => true,
            Some(entry) => {
                let response: Response = serde_json::from_str(&entry.payload)?;
                return Ok(Some(response));
            }
        };
        if expired {
            entries.pop(fingerprint);
            debug!(fingerprint = %fingerprint, "Evicted expired cache entry");
        }
        Ok(None)
    }

    fn put(
        &self,
        fingerprint: &Fingerprint,
        response: &Response,
        lifetime: Duration,
    ) -> Result<(), BackendError> {
        if lifetime.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let expires_at = now
            .checked_add(lifetime)
            .or_else(|| now.checked_add(MAX_CACHE_LIFETIME))
            .ok_or_else(|| BackendError::Unavailable("cache expiry out of range".to_string()))?;
        let payload = serde_json::to_string(response)?;
        let entry = CachedEntry {
            payload,
            expires_at,
        };
        self.lock()?.put(fingerprint.clone(), entry);
        Ok(())
    }
}
