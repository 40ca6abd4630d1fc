use std::pin::Pin;

use anyhow::{ Context, Result };
use async_trait::async_trait;
use futures::{ Sink, Stream, StreamExt };
use tokio_tungstenite::connect_async;
use tungstenite::{ protocol::Message, Error as WsError };
use tracing::info;
use url::Url;

/// Outbound half of a streaming connection
pub type WsSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Inbound half of a streaming connection
pub type WsSource = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;

/// Opens streaming connections; the feed only ever sees the split halves
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<(WsSink, WsSource)>;
}

/// WebSocket connector over tokio-tungstenite
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl StreamConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<(WsSink, WsSource)> {
        info!(host = url.host_str().unwrap_or_default(), "Connecting to KuCoin WebSocket");

        let (ws_stream, _) = connect_async(url.as_str()).await.context(
            "Failed to connect to KuCoin WebSocket"
        )?;

        let (sink, source) = ws_stream.split();
        Ok((Box::pin(sink), Box::pin(source)))
    }
}

/// Streaming URL with the connection token and a fresh connect id
pub fn stream_url(endpoint: &str, token: &str, connect_id: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint).with_context(||
        format!("Invalid stream endpoint: {}", endpoint)
    )?;
    url.query_pairs_mut().append_pair("token", token).append_pair("connectId", connect_id);
    Ok(url)
}
