//! API view (JSON).
//!
//! Missing fields and explicit `null`s decode to their defaults and unknown
//! fields are ignored; the desktop client is the only consumer and always
//! sends full records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `null` keeps the zero value instead of failing the whole body.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Common header block carried by every record on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonApiHeader {
    /// Client-chosen identity; equals the store key's string id.
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(rename = "gcversion", deserialize_with = "null_as_default")]
    pub gc_version: String,
    /// Server-set on every write.
    #[serde(deserialize_with = "null_as_default")]
    pub last_changed: DateTime<Utc>,
    #[serde(deserialize_with = "null_as_default")]
    pub creator_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub curated: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub deleted: bool,
}

/// Full user metric, used for GET/POST/PUT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserMetricApi {
    #[serde(deserialize_with = "null_as_default")]
    pub header: CommonApiHeader,
    /// Opaque metric definition. The `metrictxml` spelling is what the client reads.
    #[serde(rename = "metrictxml", deserialize_with = "null_as_default")]
    pub metric_xml: String,
    #[serde(deserialize_with = "null_as_default")]
    pub creator_nick: String,
    #[serde(deserialize_with = "null_as_default")]
    pub creator_email: String,
}

/// Header-only projection used for bulk listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserMetricHeaderOnlyApi {
    #[serde(deserialize_with = "null_as_default")]
    pub header: CommonApiHeader,
}
