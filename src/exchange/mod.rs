pub mod client;
pub mod connector;
pub mod error;
pub mod feed;
pub mod kucoin;
