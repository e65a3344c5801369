use std::time::Duration;

use fightsync_core::error::AppError;
use fightsync_core::traits::Fetcher;
use reqwest::{Client, StatusCode};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; fightsync/0.1)";

/// Plain HTTP fetcher using reqwest.
///
/// When built with [`restrict_to_host`](Self::restrict_to_host), URLs on any
/// other host are refused before a request is made. Scraped links come from
/// third-party markup, so the sync commands pin fetching to the configured
/// site.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    allowed_host: Option<String>,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            allowed_host: None,
        })
    }

    /// Only fetch URLs whose host is `base`'s host.
    pub fn restrict_to_host(mut self, base: &Url) -> Self {
        self.allowed_host = base.host_str().map(str::to_ascii_lowercase);
        self
    }

    fn check_url(&self, url: &str) -> Result<(), AppError> {
        let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(AppError::HttpError(format!(
                    "URL scheme '{scheme}' is not allowed (only http/https)"
                )));
            }
        }
        if let Some(allowed) = &self.allowed_host {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            if &host != allowed {
                return Err(AppError::HttpError(format!(
                    "Refusing off-site URL {url} (allowed host: {allowed})"
                )));
            }
        }
        Ok(())
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.check_url(url)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to read response body: {e}")))?;
        tracing::debug!(url = %url, bytes = body.len(), "Fetched");
        Ok(body)
    }
}
