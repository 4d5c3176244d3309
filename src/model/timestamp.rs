//! `yyyy-MM-ddTHH:mm:ss` timestamps, as used by every input and report file.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Current local time, truncated to whole seconds by the format.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub mod optional {
    use super::*;

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_str(&at.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDateTime::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(default, with = "optional")]
        at: Option<NaiveDateTime>,
    }

    #[test]
    fn test_parse_and_format() {
        let stamped: Stamped =
            serde_json::from_str(r#"{"at": "2023-02-27T09:15:00"}"#).expect("parse");
        let at = stamped.at.expect("timestamp");
        assert_eq!(at.format(FORMAT).to_string(), "2023-02-27T09:15:00");

        let json = serde_json::to_string(&stamped).expect("serialize");
        assert_eq!(json, r#"{"at":"2023-02-27T09:15:00"}"#);
    }

    #[test]
    fn test_missing_and_empty_are_none() {
        let missing: Stamped = serde_json::from_str("{}").expect("missing");
        let empty: Stamped = serde_json::from_str(r#"{"at": ""}"#).expect("empty");
        assert_eq!(missing.at, None);
        assert_eq!(empty.at, None);
        assert!(serde_json::from_str::<Stamped>(r#"{"at": "yesterday"}"#).is_err());
    }
}
