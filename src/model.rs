use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identity of a place as the favorites layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceKey {
    pub name: String,
    pub state: String,
}

impl PlaceKey {
    pub fn new(name: impl Into<String>, state: impl Into<String>) -> Self {
        PlaceKey {
            name: name.into(),
            state: state.into(),
        }
    }
}

impl fmt::Display for PlaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "name")]
    pub place_name: String,
    pub state: String,
    #[serde(default)]
    pub category: String,
    #[serde(
        default,
        alias = "date_added",
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub added_at: Option<DateTime<Utc>>,
}

impl FavoriteRecord {
    pub fn key(&self) -> PlaceKey {
        PlaceKey::new(&self.place_name, &self.state)
    }
}

/// Pre-login favorite, kept only in durable client storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousFavoriteEntry {
    pub name: String,
    pub state: String,
}

impl AnonymousFavoriteEntry {
    pub fn key(&self) -> PlaceKey {
        PlaceKey::new(&self.name, &self.state)
    }
}

impl From<&FavoriteRecord> for AnonymousFavoriteEntry {
    fn from(record: &FavoriteRecord) -> Self {
        AnonymousFavoriteEntry {
            name: record.place_name.clone(),
            state: record.state.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub logged_in: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

/// Remote ids arrive as either JSON strings or integers.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawId> = Option::deserialize(deserializer)?;
    Ok(raw.map(|id| match id {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Timestamps the store sends in a shape we cannot read become `None`
/// instead of failing the whole list.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawTimestamp> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawTimestamp::Text(text)) => parse_timestamp(&text),
        _ => None,
    })
}

/// Accepts RFC 3339, naive ISO 8601 (taken as UTC) and RFC 2822.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(at) = DateTime::parse_from_rfc2822(raw) {
        return Some(at.with_timezone(&Utc));
    }
    tracing::debug!(raw, "unrecognised timestamp, ignoring");
    None
}
