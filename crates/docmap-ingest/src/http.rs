use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{ImportError, Result};

/// Username/password pair sent as HTTP basic auth.
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// GET client that spaces requests by `min_interval` and retries 429s and
/// transport failures a bounded number of times.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(min_interval: Duration, max_retries: u32, user_agent: &str) -> Result<Self> {
        Self::with_timeout(min_interval, max_retries, user_agent, None)
    }

    pub fn with_timeout(
        min_interval: Duration,
        max_retries: u32,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent).gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        })
    }

    async fn wait_for_rate_limit(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_auth(url, None).await
    }

    pub async fn get_with_auth(&self, url: &str, auth: Option<&BasicAuth>) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            let mut request = self.client.get(url);
            if let Some(auth) = auth {
                request = request.basic_auth(&auth.username, Some(&auth.password));
            }

            match request.send().await {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    if attempt >= self.max_retries {
                        return Err(ImportError::RateLimit(url.to_string(), wait));
                    }
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if r.status() == StatusCode::UNAUTHORIZED => {
                    return Err(ImportError::Unauthorized(url.to_string()));
                }
                Ok(r) if r.status() == StatusCode::NOT_FOUND => {
                    return Err(ImportError::NotFound(url.to_string()));
                }
                Ok(r) if r.status().is_server_error() => {
                    return Err(ImportError::ServerError {
                        url: url.to_string(),
                        status: r.status().as_u16(),
                    });
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ImportError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return r.text().await.map_err(ImportError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(ImportError::Http(e));
                    }
                    let backoff = 2u64.pow(attempt);
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        auth: Option<&BasicAuth>,
    ) -> Result<T> {
        let text = self.get_with_auth(url, auth).await?;
        if text.trim().is_empty() {
            return Err(ImportError::Parse(format!(
                "request to {url} returned without any data"
            )));
        }
        serde_json::from_str(&text).map_err(|e| ImportError::Parse(e.to_string()))
    }
}
