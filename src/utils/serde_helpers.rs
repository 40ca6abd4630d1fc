use serde::{ Deserialize, Deserializer, Serializer };
use serde::de;
use std::str::FromStr;
use tracing::Level;

/// Serialize `tracing::Level` to a lowercase string
pub fn serialize_level<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
{
    serializer.serialize_str(&level.as_str().to_lowercase())
}

/// Deserialize `tracing::Level` from a string such as "info" or "WARN"
pub fn deserialize_level<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where D: Deserializer<'de>
{
    let raw = String::deserialize(deserializer)?;
    Level::from_str(&raw).map_err(|_| de::Error::custom(format!("unknown log level: {}", raw)))
}

/// Prices arrive as decimal strings, occasionally as bare numbers or null
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Text(String),
    Number(f64),
}

/// Deserialize an optional price; null and "" map to `None`, garbage is an error
pub fn deserialize_opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where D: Deserializer<'de>
{
    match Option::<RawPrice>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPrice::Number(n)) => Ok(Some(n)),
        Some(RawPrice::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawPrice::Text(s)) =>
            s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid price: {:?}", s))),
    }
}
