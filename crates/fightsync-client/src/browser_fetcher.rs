use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use fightsync_core::error::AppError;
use fightsync_core::traits::Fetcher;
use futures::StreamExt;

/// Headless Chromium fetcher for pages whose fight card or history is
/// rendered client-side.
///
/// One browser process is shared by every clone; each fetch opens a tab,
/// waits for `wait_for` to appear, reads the DOM and closes the tab.
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    timeout: Duration,
    wait_for: String,
}

impl BrowserFetcher {
    /// Launch with a 45 s page timeout, waiting for `<body>`.
    pub async fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(45)).await
    }

    pub async fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
        if let Some(bin) = find_chrome_binary() {
            tracing::info!(path = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Generic(format!("Failed to launch browser: {e}")))?;

        // The CDP connection only makes progress while the handler is polled.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
            wait_for: "body".to_string(),
        })
    }

    /// Wait for `selector` instead of `<body>` before reading the page.
    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = selector.into();
        self
    }
}

/// `CHROME_BIN` first, then the usual install locations. `None` lets
/// chromiumoxide search on its own.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let load = async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| AppError::NetworkError(format!("Failed to open {url}: {e}")))?;

            page.find_element(self.wait_for.as_str()).await.map_err(|e| {
                AppError::HttpError(format!("{url} never rendered '{}': {e}", self.wait_for))
            })?;

            let html = page
                .content()
                .await
                .map_err(|e| AppError::HttpError(format!("Failed to read {url}: {e}")))?;

            if let Err(e) = page.close().await {
                tracing::debug!(url = %url, error = %e, "Failed to close tab");
            }
            Ok::<String, AppError>(html)
        };

        match tokio::time::timeout(self.timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.timeout.as_secs())),
        }
    }
}
