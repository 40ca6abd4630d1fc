use async_trait::async_trait;
use reqwest::{ Client as HttpClient, Url };
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{ Duration, Instant };
use tracing::{ debug, error, info };

use crate::exchange::client::{ ExchangeClient, StreamToken };
use crate::exchange::error::ExchangeError;
use crate::models::kucoin_models::{
    AllTickers,
    ApiResponse,
    BulletToken,
    Ticker,
    KUCOIN_SUCCESS_CODE,
};
use crate::scheduler::rate_limiter::RateLimiter;

pub const KUCOIN_REST_URL: &str = "https://api.kucoin.com/api/";

const ALL_TICKERS_PATH: &str = "v1/market/allTickers";
const BULLET_PUBLIC_PATH: &str = "v1/bullet-public";

pub struct KucoinClient {
    /// Base URL for API requests
    base_url: Url,

    /// Pooled HTTP client
    http: HttpClient,

    /// Shared REST budget
    limiter: Arc<RateLimiter>,
}

impl KucoinClient {
    /// Create a new KuCoin client
    pub fn new(base_url: &str, limiter: Arc<RateLimiter>) -> Result<Self, ExchangeError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .tcp_nodelay(true) // Disable Nagle's algorithm for low latency
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http,
            limiter,
        })
    }

    /// Check HTTP status, then the API envelope, and hand back the payload
    async fn read_data<T: DeserializeOwned>(
        response: reqwest::Response
    ) -> Result<T, ExchangeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("KuCoin API error: {} - {}", status, body);
            return Err(ExchangeError::Status { status, body });
        }

        let envelope: ApiResponse<T> = response.json().await?;
        unwrap_envelope(envelope)
    }
}

/// Parse the REST base; `join` drops the last path segment unless it ends in '/'
pub fn parse_base_url(base_url: &str) -> Result<Url, ExchangeError> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Turn a non-success code or an empty `data` into an error
pub fn unwrap_envelope<T>(envelope: ApiResponse<T>) -> Result<T, ExchangeError> {
    if envelope.code != KUCOIN_SUCCESS_CODE {
        return Err(ExchangeError::Api {
            code: envelope.code,
            msg: envelope.msg.unwrap_or_default(),
        });
    }
    envelope.data.ok_or(ExchangeError::EmptyResponse)
}

/// Pick the first instance server out of a bullet response
pub fn into_stream_token(bullet: BulletToken) -> Result<StreamToken, ExchangeError> {
    let server = bullet.instance_servers
        .into_iter()
        .next()
        .ok_or(ExchangeError::EmptyInstanceServers)?;

    Ok(StreamToken { token: bullet.token, server })
}

#[async_trait]
impl ExchangeClient for KucoinClient {
    fn name(&self) -> &str {
        "KuCoin"
    }

    async fn get_all_tickers(&self) -> Result<Vec<Ticker>, ExchangeError> {
        self.limiter.acquire().await;

        let start = Instant::now();
        let url = self.base_url.join(ALL_TICKERS_PATH)?;
        debug!(%url, "Fetching all tickers");

        let response = self.http.get(url).send().await?;
        let tickers: AllTickers = Self::read_data(response).await?;

        info!("Fetched {} tickers from KuCoin in {:.2?}", tickers.ticker.len(), start.elapsed());

        Ok(tickers.ticker)
    }

    async fn get_public_token(&self) -> Result<StreamToken, ExchangeError> {
        self.limiter.acquire().await;

        let url = self.base_url.join(BULLET_PUBLIC_PATH)?;
        debug!(%url, "Requesting public stream token");

        let response = self.http.post(url).send().await?;
        let bullet: BulletToken = Self::read_data(response).await?;

        into_stream_token(bullet)
    }
}
