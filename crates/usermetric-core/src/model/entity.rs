//! Stored view.
//!
//! Property names follow the store's conventions (PascalCase, nested structs
//! flattened to dotted paths such as `Header.LastChanged` for filters).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::key::USERMETRIC_KIND;

/// A type that can be persisted as a document of one kind.
pub trait Entity: Serialize + DeserializeOwned + Default + Send {
    /// Store kind the documents are written under.
    const KIND: &'static str;
    /// Dotted property paths excluded from indexes (not filterable or orderable).
    const NOINDEX: &'static [&'static str] = &[];
}

/// Property path of the change timestamp, used for listing filters and order.
pub const LAST_CHANGED_PATH: &str = "Header.LastChanged";

/// Stored common header. The key is not part of it; it lives in the store key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CommonEntityHeader {
    pub name: String,
    pub description: String,
    pub language: String,
    pub gc_version: String,
    pub last_changed: DateTime<Utc>,
    pub creator_id: String,
    pub curated: bool,
    pub deleted: bool,
}

/// Full stored user metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserMetricEntity {
    pub header: CommonEntityHeader,
    #[serde(rename = "MetricXML")]
    pub metric_xml: String,
    pub creator_nick: String,
    pub creator_email: String,
}

impl Entity for UserMetricEntity {
    const KIND: &'static str = USERMETRIC_KIND;
    const NOINDEX: &'static [&'static str] = &[
        "Header.Description",
        "MetricXML",
        "CreatorNick",
        "CreatorEmail",
    ];
}

impl UserMetricEntity {
    /// Tombstone: flag and payload erasure always land in the same write.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.header.deleted = true;
        self.metric_xml.clear();
        self.header.last_changed = now;
    }

    pub fn set_curated(&mut self, curated: bool, now: DateTime<Utc>) {
        self.header.curated = curated;
        self.header.last_changed = now;
    }
}

/// Header-only read shape over the same documents as `UserMetricEntity`.
///
/// Decoding a full document into it always reports the payload/attribution
/// properties as a field mismatch; listing tolerates that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserMetricEntityHeaderOnly {
    pub header: CommonEntityHeader,
}

impl Entity for UserMetricEntityHeaderOnly {
    const KIND: &'static str = USERMETRIC_KIND;
    const NOINDEX: &'static [&'static str] = &["Header.Description"];
}
