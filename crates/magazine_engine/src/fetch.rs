use std::io::{self, Read};
use std::time::Duration;

use engine_logging::engine_info;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::KeyedCache;
use crate::{FailureKind, FetchError};

const READ_BUFFER: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            redirect_limit: 5,
            max_bytes: 32 * 1024 * 1024,
        }
    }
}

/// A fully buffered HTTP response, indistinguishable whether it came from
/// the network or from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct BlobHeaderRef<'a> {
    status: u16,
    url: &'a str,
    headers: &'a [(String, String)],
}

#[derive(Deserialize)]
struct BlobHeader {
    status: u16,
    url: String,
    headers: Vec<(String, String)>,
}

impl CachedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn chunks(&self, size: usize) -> std::slice::Chunks<'_, u8> {
        self.body.chunks(size)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turns 4xx and 5xx responses into [`FailureKind::HttpStatus`].
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if (400..600).contains(&self.status) {
            return Err(FetchError::new(
                FailureKind::HttpStatus(self.status),
                format!("{} returned {}", self.url, self.status),
            ));
        }
        Ok(self)
    }

    /// Cache blob: one line of compact JSON metadata, then the raw body.
    pub fn to_blob(&self) -> Result<Vec<u8>, serde_json::Error> {
        let header = BlobHeaderRef {
            status: self.status,
            url: &self.url,
            headers: &self.headers,
        };
        let mut blob = serde_json::to_vec(&header)?;
        blob.push(b'\n');
        blob.extend_from_slice(&self.body);
        Ok(blob)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, serde_json::Error> {
        let split = blob.iter().position(|b| *b == b'\n').ok_or_else(|| {
            <serde_json::Error as serde::de::Error>::custom("missing header terminator")
        })?;
        let header: BlobHeader = serde_json::from_slice(&blob[..split])?;
        Ok(Self {
            status: header.status,
            url: header.url,
            headers: header.headers,
            body: blob[split + 1..].to_vec(),
        })
    }
}

/// Performs the actual network round trip for a cache miss.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<CachedResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    settings: FetchSettings,
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let redirect_limit = settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { settings, client })
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<CachedResponse, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .map_err(map_reqwest_error)?;

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        let mut buffer = [0u8; READ_BUFFER];
        loop {
            let read = response.read(&mut buffer).map_err(map_io_error)?;
            if read == 0 {
                break;
            }
            let next_len = body.len() as u64 + read as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            body.extend_from_slice(&buffer[..read]);
        }

        Ok(CachedResponse {
            status,
            url: final_url,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn map_io_error(err: io::Error) -> FetchError {
    if err.kind() == io::ErrorKind::TimedOut {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

/// Cached HTTP GET. Every request goes through the [`KeyedCache`] first.
pub struct Fetcher {
    cache: KeyedCache,
    transport: Box<dyn Transport>,
}

impl Fetcher {
    pub fn new(cache: KeyedCache, transport: impl Transport + 'static) -> Self {
        Self {
            cache,
            transport: Box::new(transport),
        }
    }

    pub fn cache(&self) -> &KeyedCache {
        &self.cache
    }

    /// GET `url` with `params` appended as query parameters.
    ///
    /// Client and server error statuses fail with [`FailureKind::HttpStatus`]
    /// and are never cached.
    pub fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<CachedResponse, FetchError> {
        engine_info!("Downloading {}", url);

        let mut request_url =
            Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !params.is_empty() {
            request_url.query_pairs_mut().extend_pairs(params.iter());
        }

        self.cache.get_or_fetch(url, params, || {
            self.transport.get(&request_url)?.error_for_status()
        })
    }
}
