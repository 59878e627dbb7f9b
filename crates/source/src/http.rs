use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::{FetchError, FetchRequest, SourceConfig, UserSource, UsersPage, DEFAULT_TIMEOUT};

/// Bulk reader for the remote users endpoint.
pub struct HttpUserSource {
    client: Client,
    base_url: String,
}

impl HttpUserSource {
    /// A zero timeout falls back to [`DEFAULT_TIMEOUT`].
    pub fn new(cfg: &SourceConfig) -> Result<Self, FetchError> {
        let timeout = if cfg.timeout.is_zero() { DEFAULT_TIMEOUT } else { cfg.timeout };
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("usertable/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Unknown(format!("building http client: {e}")))?;
        Ok(Self { client, base_url: cfg.base_url.trim_end_matches('/').to_string() })
    }

    pub fn url_for(&self, req: FetchRequest) -> String {
        format!("{}?skip={}&limit={}", self.base_url, req.skip, req.limit)
    }

    async fn fetch_inner(&self, url: &str) -> Result<UsersPage, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Server { status: status.as_u16() });
        }
        let body = resp.bytes().await.map_err(classify)?;
        debug!(bytes = body.len(), "source: body received");
        serde_json::from_slice::<UsersPage>(&body).map_err(|e| FetchError::Unknown(format!("malformed payload: {e}")))
    }
}

/// Map a transport error onto the fetch taxonomy.
fn classify(e: reqwest::Error) -> FetchError {
    if let Some(status) = e.status() {
        return FetchError::Server { status: status.as_u16() };
    }
    if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
        FetchError::Network(e.to_string())
    } else {
        FetchError::Unknown(e.to_string())
    }
}

#[async_trait::async_trait]
impl UserSource for HttpUserSource {
    async fn fetch_users(&self, req: FetchRequest) -> Result<UsersPage, FetchError> {
        let t0 = Instant::now();
        let url = self.url_for(req);
        info!(url = %url, "source: fetch start");
        match self.fetch_inner(&url).await {
            Ok(page) => {
                info!(count = page.users.len(), total = page.total, took_ms = %t0.elapsed().as_millis(), "source: fetch ok");
                Ok(page)
            }
            Err(e) => {
                metrics::counter!("source_fetch_errors_total", 1u64, "kind" => format!("{:?}", e.kind()));
                warn!(error = %e, took_ms = %t0.elapsed().as_millis(), "source: fetch failed");
                Err(e)
            }
        }
    }
}
