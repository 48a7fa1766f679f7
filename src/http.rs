use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Something that can download a playlist.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub(crate) fn http_client(config: &FetchConfig) -> anyhow::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))
}

/// Fetches `http` and `https` URLs with a blocking reqwest client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config)?,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::new(url, format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::new(
                url,
                format!("unsupported scheme: {}", parsed.scheme()),
            ));
        }

        debug!(url, "fetching playlist");
        let response = self
            .client
            .get(parsed)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::new(url, e.to_string()))?;
        let bytes = response
            .bytes()
            .map_err(|e| FetchError::new(url, e.to_string()))?;
        debug!(url, bytes = bytes.len(), "fetched playlist");

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
