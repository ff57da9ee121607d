//! Decode-once helpers for request bodies and query parameters.

use chrono::{DateTime, Utc};

use usermetric_core::error::{Result, UserMetricError};
use usermetric_core::model::UserMetricApi;

/// Decode a full record body. Undecodable bodies are `MalformedBody`.
pub fn decode_usermetric(body: &[u8]) -> Result<UserMetricApi> {
    serde_json::from_slice(body).map_err(|e| UserMetricError::MalformedBody(e.to_string()))
}

/// `dateFrom` as RFC 3339; absent or empty means the epoch.
pub fn parse_date_from(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None | Some("") => Ok(DateTime::<Utc>::default()),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                UserMetricError::BadInput(format!(
                    "parsing time {s:?}: {e} - Correct format is RFC3339"
                ))
            }),
    }
}

/// Boolean with the usual spellings: 1/t/T/TRUE/true/True and 0/f/F/FALSE/false/False.
pub fn parse_bool(name: &str, raw: Option<&str>) -> Result<bool> {
    let raw = raw.unwrap_or("");
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(UserMetricError::BadInput(format!(
            "{name}: parsing {raw:?}: invalid syntax"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use usermetric_core::error::ClientCode;

    #[test]
    fn absent_date_is_epoch() {
        assert_eq!(parse_date_from(None).unwrap().timestamp(), 0);
        assert_eq!(parse_date_from(Some("")).unwrap().timestamp(), 0);
    }

    #[test]
    fn date_offsets_normalise_to_utc() {
        let t = parse_date_from(Some("2024-03-02T08:00:00+02:00")).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 2, 6, 0, 0).unwrap());
    }

    #[test]
    fn bad_date_hints_format() {
        let err = parse_date_from(Some("not-a-date")).unwrap_err();
        assert_eq!(err.client_code(), ClientCode::BadInput);
        assert!(err.to_string().ends_with("Correct format is RFC3339"));
    }

    #[test]
    fn bool_spellings() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_bool("newStatus", Some(s)).unwrap());
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!parse_bool("newStatus", Some(s)).unwrap());
        }
        assert!(parse_bool("newStatus", Some("yes")).is_err());
        assert!(parse_bool("newStatus", None).is_err());
    }

    #[test]
    fn malformed_body_is_its_own_kind() {
        let err = decode_usermetric(b"{\"header\": ").unwrap_err();
        assert_eq!(err.client_code(), ClientCode::MalformedBody);
    }

    #[test]
    fn null_fields_decode_to_defaults() {
        let body = br#"{"header":{"key":"m1","description":null,"lastChanged":null},"metrictxml":"<x/>","creatorNick":null,"creatorEmail":null}"#;
        let m = decode_usermetric(body).unwrap();
        assert_eq!(m.header.key, "m1");
        assert!(m.header.description.is_empty());
        assert_eq!(m.header.last_changed.timestamp(), 0);
        assert_eq!(m.metric_xml, "<x/>");
        assert!(m.creator_nick.is_empty());
    }
}
