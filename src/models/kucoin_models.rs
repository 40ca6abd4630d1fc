use serde::{ Deserialize, Serialize };

use crate::utils::serde_helpers::deserialize_opt_price;

/// KuCoin's success code; every REST body carries one
pub const KUCOIN_SUCCESS_CODE: &str = "200000";

/// Envelope around every KuCoin REST response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub data: Option<T>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Body of `GET /api/v1/market/allTickers`
#[derive(Debug, Deserialize)]
pub struct AllTickers {
    #[serde(default)]
    pub time: i64,
    pub ticker: Vec<Ticker>,
}

/// One tradable pair with its best bid (`buy`) and best ask (`sell`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    #[serde(default, deserialize_with = "deserialize_opt_price")]
    pub buy: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_price")]
    pub sell: Option<f64>,
}

/// Body of `POST /api/v1/bullet-public`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletToken {
    pub token: String,
    pub instance_servers: Vec<InstanceServer>,
}

/// Streaming endpoint handed out with a bullet token
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceServer {
    pub endpoint: String,
    /// Milliseconds between client pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a ping before dropping us
    pub ping_timeout: u64,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub encrypt: Option<bool>,
}

/// Subscription request for a public topic
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub topic: &'a str,
    pub private_channel: bool,
    pub response: bool,
}

impl<'a> SubscribeRequest<'a> {
    pub fn new(id: &'a str, topic: &'a str) -> Self {
        Self {
            id,
            kind: "subscribe",
            topic,
            private_channel: false,
            response: true,
        }
    }
}

/// Application-level heartbeat
#[derive(Debug, Serialize)]
pub struct PingRequest<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> PingRequest<'a> {
    pub fn new(id: &'a str) -> Self {
        Self { id, kind: "ping" }
    }
}

/// Inbound frame on the public stream, discriminated by `type`
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WsFrame {
    Welcome {
        #[serde(default)]
        id: Option<String>,
    },
    Ack {
        #[serde(default)]
        id: Option<String>,
    },
    Pong {
        #[serde(default)]
        id: Option<String>,
    },
    Message {
        #[serde(default)]
        topic: Option<String>,
        subject: String,
        data: TickerData,
    },
    Error {
        #[serde(default)]
        code: Option<serde_json::Value>,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

/// Payload of an all-tickers push
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerData {
    #[serde(default, deserialize_with = "deserialize_opt_price")]
    pub best_bid: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_price")]
    pub best_ask: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_all_tickers() {
        let body =
            r#"{"code":"200000","data":{"time":1602832092060,"ticker":[
            {"symbol":"BTC-USDT","symbolName":"BTC-USDT","buy":"60000","sell":"60010","vol":"1"},
            {"symbol":"NEW-USDT","buy":null,"sell":null}]}}"#;
        let resp: ApiResponse<AllTickers> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.code, KUCOIN_SUCCESS_CODE);
        let tickers = resp.data.unwrap().ticker;
        assert_eq!(tickers[0].buy, Some(60000.0));
        assert_eq!(tickers[0].sell, Some(60010.0));
        assert_eq!(tickers[1].buy, None);
    }

    #[test]
    fn decodes_bullet_token() {
        let body =
            r#"{"code":"200000","data":{"token":"abc","instanceServers":[
            {"endpoint":"wss://ws-api-spot.kucoin.com/","encrypt":true,"protocol":"websocket","pingInterval":18000,"pingTimeout":10000}]}}"#;
        let resp: ApiResponse<BulletToken> = serde_json::from_str(body).unwrap();
        let bullet = resp.data.unwrap();
        assert_eq!(bullet.token, "abc");
        assert_eq!(bullet.instance_servers[0].ping_interval, 18000);
        assert_eq!(bullet.instance_servers[0].ping_timeout, 10000);
    }

    #[test]
    fn encodes_subscribe_request() {
        let json = serde_json::to_value(SubscribeRequest::new("42", "/market/ticker:all")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "42",
                "type": "subscribe",
                "topic": "/market/ticker:all",
                "privateChannel": false,
                "response": true
            })
        );
    }

    #[test]
    fn decodes_frames_by_type() {
        let frame: WsFrame = serde_json::from_str(
            r#"{"type":"message","topic":"/market/ticker:all","subject":"ETH-BTC","data":{"bestBid":"0.05","bestAsk":"0.0501","size":"1"}}"#
        ).unwrap();
        match frame {
            WsFrame::Message { subject, data, .. } => {
                assert_eq!(subject, "ETH-BTC");
                assert_eq!(data.best_bid, Some(0.05));
                assert_eq!(data.best_ask, Some(0.0501));
            }
            other => panic!("unexpected frame {:?}", other),
        }

        assert!(matches!(serde_json::from_str::<WsFrame>(r#"{"id":"1","type":"pong"}"#).unwrap(), WsFrame::Pong { .. }));
        assert!(matches!(serde_json::from_str::<WsFrame>(r#"{"type":"notice"}"#).unwrap(), WsFrame::Other));
    }
}
