use strum_macros::Display;

/// Lifecycle of the streaming market-data connection.
///
/// `Connecting -> Open -> AwaitingPong -> Open` while healthy; any missed pong,
/// transport error or close moves to `Reconnecting`, which returns to
/// `Connecting` after the fixed backoff. `Closed` is only entered on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connecting,
    Open,
    AwaitingPong,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::AwaitingPong)
    }
}
