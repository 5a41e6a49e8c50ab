use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{FailureKind, FetchError, FetchedImage};

/// Environment variables consulted for an outbound forward proxy, in order.
pub const PROXY_ENV_VARS: [&str; 2] = ["HTTPS_PROXY", "HTTP_PROXY"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMode {
    /// Connect to the origin directly.
    Direct,
    /// Route every request through a forward proxy.
    Forward(String),
    /// Ask a relay endpoint to fetch on our behalf: `{endpoint}?url=<encoded>`.
    Relay(String),
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub proxy: ProxyMode,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 20 * 1024 * 1024,
            proxy: ProxyMode::Direct,
        }
    }
}

impl FetchSettings {
    /// Defaults, with a forward proxy taken from `HTTPS_PROXY`/`HTTP_PROXY`.
    pub fn from_env() -> Self {
        let proxy = PROXY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .map(ProxyMode::Forward)
            .unwrap_or(ProxyMode::Direct);
        Self {
            proxy,
            ..Self::default()
        }
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);
        if let ProxyMode::Forward(proxy_url) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
                .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

/// Outbound image download.
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestImageFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestImageFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = settings.build_client()?;
        Ok(Self { settings, client })
    }

    /// Where the request actually goes once the proxy mode is applied.
    pub fn request_url(&self, url: &str) -> Result<Url, FetchError> {
        let target =
            Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        match &self.settings.proxy {
            ProxyMode::Relay(endpoint) => {
                Url::parse_with_params(endpoint, &[("url", target.as_str())])
                    .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
            }
            ProxyMode::Direct | ProxyMode::Forward(_) => Ok(target),
        }
    }
}

#[async_trait::async_trait]
impl ImageFetcher for ReqwestImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let request_url = self.request_url(url)?;
        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if bytes.len() as u64 > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(bytes.len() as u64),
                },
                "response too large",
            ));
        }

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
