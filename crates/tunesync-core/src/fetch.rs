//! Blocking HTTP(S) download of a URL into a local file.
//!
//! The fetcher opens the destination first, then streams the response body
//! into it as it arrives. There is no caching and no retry. A failed fetch may
//! leave a partial or empty destination behind, so callers that need an
//! all-or-nothing result fetch into a temporary path and rename afterwards
//! (see [`crate::assets`]).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, error};

use crate::error::{Error, Result, TransferError};

/// Downloads a URL to a file.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest`, creating or truncating it.
    ///
    /// Returns the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Fetcher`] backed by a blocking `reqwest` client with transport defaults.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a fresh HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend setup).
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder().build().map_err(|e| {
            Error::Transfer(TransferError::RequestFailed {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {e}"),
            })
        })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut file = File::create(dest).map_err(|e| {
            Error::Transfer(TransferError::DestinationUnavailable {
                path: dest.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        let mut response = self.client.get(url).send().map_err(|e| {
            Error::Transfer(TransferError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer(TransferError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let written = response.copy_to(&mut file).map_err(|e| {
            Error::Transfer(TransferError::Interrupted {
                url: url.to_string(),
                reason: e.to_string(),
            })
        })?;
        file.flush()?;

        Ok(written)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        match self.download(url, dest) {
            Ok(written) => {
                debug!("Fetched {} to {} ({} bytes)", url, dest.display(), written);
                Ok(written)
            }
            Err(e) => {
                error!("Couldn't fetch file from {} to {}: {}", url, dest.display(), e);
                Err(e)
            }
        }
    }
}

/// Boolean view of [`Fetcher::fetch`]: `true` if the transfer completed.
pub fn fetch_to<F: Fetcher + ?Sized>(fetcher: &F, url: &str, dest: &Path) -> bool {
    fetcher.fetch(url, dest).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_writes_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/cover.png")
            .with_status(200)
            .with_body("cover-bytes")
            .create();

        let temp_dir = TempDir::new().expect("Should create temp dir");
        let dest = temp_dir.path().join("cover.png");
        let fetcher = HttpFetcher::new().unwrap();

        let written = fetcher
            .fetch(&format!("{}/cover.png", server.url()), &dest)
            .unwrap();
        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"cover-bytes");
        mock.assert();
    }

    #[test]
    fn test_fetch_non_success_status_fails() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing").with_status(404).create();

        let temp_dir = TempDir::new().expect("Should create temp dir");
        let dest = temp_dir.path().join("out");
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher
            .fetch(&format!("{}/missing", server.url()), &dest)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::HttpStatus { status: 404, .. })
        ));
        assert!(!fetch_to(&fetcher, &format!("{}/missing", server.url()), &dest));
    }

    #[test]
    fn test_fetch_unopenable_destination_fails() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let dest = temp_dir.path().join("no_such_dir").join("cover.png");
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher.fetch("http://127.0.0.1:9/cover.png", &dest).unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::DestinationUnavailable { .. })
        ));
    }

    #[test]
    fn test_fetch_connection_refused_fails() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let dest = temp_dir.path().join("cover.png");
        let fetcher = HttpFetcher::new().unwrap();

        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = fetcher
            .fetch(&format!("http://127.0.0.1:{port}/cover.png"), &dest)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::RequestFailed { .. })
        ));
    }
}
