use thiserror::Error;

/// Failures talking to the exchange over REST
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("exchange API error {code}: {msg}")]
    Api {
        code: String,
        msg: String,
    },

    #[error("response carried no data")]
    EmptyResponse,

    #[error("bullet token carried no instance servers")]
    EmptyInstanceServers,

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A streaming frame that could not be turned into a quote update
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("frame for {0} carried neither bid nor ask")]
    EmptyQuote(String),

    #[error("frame has an empty subject")]
    MissingSubject,
}
