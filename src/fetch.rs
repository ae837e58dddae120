//! Transport layer: turns a URL into a response body.
//!
//! The clients never talk to the network directly. They go through a [`Fetch`]
//! implementation, which can be the blocking HTTP client below, the disk cache that
//! wraps it, or any closure `Fn(&str) -> anyhow::Result<String>` (handy for tests and
//! for callers that bring their own cache).
use crate::error::Result;
use anyhow::{Context, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Anything that can fetch a URL and return the raw response body.
pub trait Fetch {
    fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

impl<F> Fetch for F
where
    F: Fn(&str) -> anyhow::Result<String>,
{
    fn fetch(&self, url: &str) -> anyhow::Result<String> {
        self(url)
    }
}

/// The transport used by `Indicators::new` and `Climate::new`.
pub type DefaultFetcher = CachedFetcher<HttpFetcher>;

/// Build the default transport: HTTP behind a one-day disk cache in the temp dir.
pub fn default_fetcher() -> Result<DefaultFetcher> {
    CachedFetcher::new(HttpFetcher::new()?, default_cache_dir())
}

/// `<tmp>/wbdata`
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("wbdata")
}

/// Plain blocking HTTP GET with a small retry for transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: HttpClient,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("wbdata_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::Error::Transport {
                url: String::new(),
                source: Box::new(e),
            })?;
        Ok(Self { http })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<String> {
        // Small retry for transient failures (5xx / network errors)
        let mut last_err: Option<anyhow::Error> = None;
        for backoff_ms in [100u64, 300, 700] {
            match self.http.get(url).send() {
                Ok(r) if r.status().is_success() => {
                    return r.text().context("read response body");
                }
                Ok(r) if r.status().is_server_error() => {
                    log::debug!("HTTP {} from {}, retrying", r.status(), url);
                }
                Ok(r) => bail!("request failed with HTTP {}", r.status()),
                Err(e) => last_err = Some(e.into()),
            }
            std::thread::sleep(Duration::from_millis(backoff_ms));
        }
        bail!("network error: {:?}", last_err);
    }
}

/// Disk cache in front of another fetcher.
///
/// Bodies are stored one file per URL, named by the MD5 hex digest of the URL, and
/// are served from disk while younger than `max_age`. Writes go through a temp file
/// in the cache directory followed by a rename, so readers never see a partial body.
#[derive(Debug, Clone)]
pub struct CachedFetcher<F> {
    inner: F,
    dir: PathBuf,
    max_age: Duration,
}

const ONE_DAY: Duration = Duration::from_secs(60 * 60 * 24);

impl<F: Fetch> CachedFetcher<F> {
    /// Wrap `inner`, creating `dir` if needed. Entries expire after one day.
    pub fn new(inner: F, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            log::debug!("created cache directory {}", dir.display());
        }
        Ok(Self {
            inner,
            dir,
            max_age: ONE_DAY,
        })
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache file for `url`.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let mut context = md5::Context::new();
        context.consume(url.as_bytes());
        self.dir.join(format!("{:x}", context.finalize()))
    }

    fn read_fresh(&self, path: &Path) -> Option<String> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        if age >= self.max_age {
            return None;
        }
        fs::read_to_string(path).ok()
    }

    fn store(&self, path: &Path, body: &str) -> anyhow::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.persist(path)?;
        Ok(())
    }
}

impl<F: Fetch> Fetch for CachedFetcher<F> {
    fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let path = self.cache_path(url);
        if let Some(body) = self.read_fresh(&path) {
            log::debug!("cache hit for {}", url);
            return Ok(body);
        }
        log::debug!("cache miss for {}, fetching", url);
        let body = self.inner.fetch(url)?;
        match self.store(&path, &body) {
            Ok(()) => log::debug!("{} saved to cache", url),
            Err(e) => log::warn!("could not cache {}: {}", url, e),
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    #[test]
    fn second_fetch_is_served_from_disk() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0);
        let inner = |_: &str| -> anyhow::Result<String> {
            calls.set(calls.get() + 1);
            Ok("[1,2,3]".to_string())
        };
        let cached = CachedFetcher::new(inner, dir.path()).unwrap();

        assert_eq!(cached.fetch("http://example.test/a").unwrap(), "[1,2,3]");
        assert_eq!(cached.fetch("http://example.test/a").unwrap(), "[1,2,3]");
        assert_eq!(calls.get(), 1);
        assert!(cached.cache_path("http://example.test/a").exists());
    }

    #[test]
    fn expired_entries_are_refetched() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0);
        let inner = |_: &str| -> anyhow::Result<String> {
            calls.set(calls.get() + 1);
            Ok(format!("body {}", calls.get()))
        };
        let cached = CachedFetcher::new(inner, dir.path())
            .unwrap()
            .with_max_age(Duration::ZERO);

        assert_eq!(cached.fetch("u").unwrap(), "body 1");
        assert_eq!(cached.fetch("u").unwrap(), "body 2");
    }

    #[test]
    fn distinct_urls_get_distinct_files() {
        let dir = tempdir().unwrap();
        let cached = CachedFetcher::new(
            |u: &str| -> anyhow::Result<String> { Ok(u.to_string()) },
            dir.path(),
        )
        .unwrap();
        assert_ne!(cached.cache_path("a"), cached.cache_path("b"));
        assert_eq!(cached.fetch("a").unwrap(), "a");
        assert_eq!(cached.fetch("b").unwrap(), "b");
    }

    #[test]
    fn creates_missing_cache_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("x").join("y");
        let cached = CachedFetcher::new(
            |_: &str| -> anyhow::Result<String> { Ok(String::new()) },
            &nested,
        )
        .unwrap();
        assert!(cached.dir().is_dir());
    }

    #[test]
    fn inner_errors_are_not_cached() {
        let dir = tempdir().unwrap();
        let cached =
            CachedFetcher::new(|_: &str| -> anyhow::Result<String> { bail!("boom") }, dir.path())
                .unwrap();
        assert!(cached.fetch("u").is_err());
        assert!(!cached.cache_path("u").exists());
    }
}
