//! Conversions between the API and the stored view.
//!
//! Both directions are total. Header fields are copied verbatim; the API `key`
//! is always taken from the store key on the way out.

use crate::key::EntityKey;

use super::api::{CommonApiHeader, UserMetricApi, UserMetricHeaderOnlyApi};
use super::entity::{CommonEntityHeader, UserMetricEntity, UserMetricEntityHeaderOnly};

impl From<CommonApiHeader> for CommonEntityHeader {
    fn from(api: CommonApiHeader) -> Self {
        Self {
            name: api.name,
            description: api.description,
            language: api.language,
            gc_version: api.gc_version,
            last_changed: api.last_changed,
            creator_id: api.creator_id,
            curated: api.curated,
            deleted: api.deleted,
        }
    }
}

impl CommonEntityHeader {
    pub fn into_api(self, key: &EntityKey) -> CommonApiHeader {
        CommonApiHeader {
            key: key.string_id().to_string(),
            name: self.name,
            description: self.description,
            language: self.language,
            gc_version: self.gc_version,
            last_changed: self.last_changed,
            creator_id: self.creator_id,
            curated: self.curated,
            deleted: self.deleted,
        }
    }
}

impl From<UserMetricApi> for UserMetricEntity {
    fn from(api: UserMetricApi) -> Self {
        Self {
            header: api.header.into(),
            metric_xml: api.metric_xml,
            creator_nick: api.creator_nick,
            creator_email: api.creator_email,
        }
    }
}

impl UserMetricEntity {
    pub fn into_api(self, key: &EntityKey) -> UserMetricApi {
        UserMetricApi {
            header: self.header.into_api(key),
            metric_xml: self.metric_xml,
            creator_nick: self.creator_nick,
            creator_email: self.creator_email,
        }
    }
}

impl UserMetricEntityHeaderOnly {
    pub fn into_api(self, key: &EntityKey) -> UserMetricHeaderOnlyApi {
        UserMetricHeaderOnlyApi {
            header: self.header.into_api(key),
        }
    }
}
