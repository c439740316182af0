use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the loader.
/// Every module returns `Result<T, LoaderError>`.
#[derive(Debug, Error)]
pub enum LoaderError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("MD5 mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    // ── Maven metadata ──────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Incomplete repository metadata: {0}")]
    MetadataIncomplete(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Artifact contents ───────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid fabric.mod.json: {0}")]
    ModManifest(String),

    // ── Host runtime ────────────────────────────────────
    #[error("Host runtime rejected request: {0}")]
    Host(String),

    // ── Cache ───────────────────────────────────────────
    #[error("Cache reported success but artifact is missing: {0}")]
    CacheInconsistent(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LoaderResult<T> = Result<T, LoaderError>;

impl From<std::io::Error> for LoaderError {
    fn from(source: std::io::Error) -> Self {
        LoaderError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LoaderError {
    /// Wrap an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` when the remote answered with 404, i.e. the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            LoaderError::DownloadFailed { status, .. } => *status == 404,
            LoaderError::Http(e) => e.status().map(|s| s.as_u16() == 404).unwrap_or(false),
            _ => false,
        }
    }
}

// ── Lookup outcome ──────────────────────────────────────
// Remote queries distinguish "does not exist" from "could not ask".

/// Outcome of a remote lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    /// The value exists and was fetched.
    Found(T),
    /// The repository answered, and there is no such value.
    NotFound,
    /// The repository could not be queried (network, timeout, bad document).
    Transient(LoaderError),
}

impl<T> Lookup<T> {
    /// Classify a fetch result: 404 collapses to `NotFound`, anything else to `Transient`.
    pub fn from_result(result: LoaderResult<T>) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(e) if e.is_not_found() => Lookup::NotFound,
            Err(e) => Lookup::Transient(e),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Transient(e) => Lookup::Transient(e),
        }
    }

    /// Chain a dependent lookup. Absence and errors short-circuit.
    pub async fn and_then_async<U, F, Fut>(self, f: F) -> Lookup<U>
    where
        F: FnOnce(T) -> Fut,
        Fut: std::future::Future<Output = Lookup<U>>,
    {
        match self {
            Lookup::Found(value) => f(value).await,
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Transient(e) => Lookup::Transient(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_404_is_not_found() {
        let err = LoaderError::DownloadFailed {
            url: "https://example.org/missing".into(),
            status: 404,
        };
        assert!(Lookup::<()>::from_result(Err(err)).is_not_found());
    }

    #[test]
    fn other_failures_are_transient() {
        let err = LoaderError::DownloadFailed {
            url: "https://example.org/broken".into(),
            status: 503,
        };
        assert!(matches!(
            Lookup::<()>::from_result(Err(err)),
            Lookup::Transient(_)
        ));
        let io = LoaderError::Other("connection reset".into());
        assert!(matches!(Lookup::<()>::from_result(Err(io)), Lookup::Transient(_)));
    }

    #[test]
    fn map_keeps_absence() {
        let missing: Lookup<u32> = Lookup::NotFound;
        assert!(missing.map(|v| v + 1).is_not_found());
        assert_eq!(Lookup::Found(1).map(|v| v + 1).found(), Some(2));
    }
}
