use async_trait::async_trait;

use crate::exchange::error::ExchangeError;
use crate::models::kucoin_models::{ InstanceServer, Ticker };

/// Short-lived credentials for one streaming connection
#[derive(Debug, Clone)]
pub struct StreamToken {
    pub token: String,
    pub server: InstanceServer,
}

/// Exchange client trait that defines the REST operations the feed needs
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the name of the exchange
    fn name(&self) -> &str;

    /// Fetch every tradable pair with its best bid/ask
    async fn get_all_tickers(&self) -> Result<Vec<Ticker>, ExchangeError>;

    /// Obtain a public streaming token and endpoint
    async fn get_public_token(&self) -> Result<StreamToken, ExchangeError>;
}
