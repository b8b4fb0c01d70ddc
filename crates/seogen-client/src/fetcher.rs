use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, redirect::Policy};
use seogen_core::error::{AppError, FetchError};
use seogen_core::models::FetchedPage;
use seogen_core::traits::Fetcher;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Settings for [`ReqwestFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP page fetcher using reqwest.
///
/// Sends browser-like headers and accepts invalid certificates: target sites
/// are often staging hosts with self-signed certs. Redirects are followed
/// by hand so every hop is logged and the hop count is capped.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    config: FetchConfig,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(FetchConfig::default())
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Self::with_config(FetchConfig::default().with_timeout(timeout))
    }

    pub fn with_config(config: FetchConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ko-KR,ko;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| AppError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn map_send_error(&self, e: &reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.config.timeout.as_secs())
        } else {
            FetchError::transport(error_chain(e))
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut redirects = 0u32;

        loop {
            tracing::debug!(url = %current, "Fetching page");
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| self.map_send_error(&e))?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty());

                if let Some(location) = location {
                    redirects += 1;
                    if redirects > self.config.max_redirects {
                        return Err(FetchError::TooManyRedirects(self.config.max_redirects));
                    }
                    let next = current.join(location).map_err(|e| FetchError::InvalidUrl {
                        url: location.to_string(),
                        reason: e.to_string(),
                    })?;
                    tracing::debug!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                    current = next;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    code: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.map_send_error(&e))?;

            tracing::info!(url = %current, bytes = bytes.len(), redirects, "Fetched page");
            return Ok(FetchedPage {
                bytes: bytes.to_vec(),
                content_type,
                final_url: current.to_string(),
            });
        }
    }
}

/// Join an error with all of its sources; the useful detail ("dns error",
/// "Connection refused") usually sits a few levels down.
fn error_chain(e: &(dyn StdError + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}
