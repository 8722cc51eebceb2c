// src/normalize.rs

//! Canonical release normalization.
//!
//! Releases are stripped of configured fields and of thumbnail URLs before
//! persistence, then serialized with stable key ordering so that a
//! byte-for-byte comparison against the previous snapshot is a valid
//! change check.

use serde_json::{Map, Value};

use crate::error::{AppError, Result};

const THUMBNAIL_FIELD: &str = "thumbnail_url";

/// Collections whose entries carry a thumbnail URL.
const THUMBNAIL_SECTIONS: [&str; 5] = ["artists", "extraartists", "companies", "labels", "series"];

/// Per-track collections whose entries carry a thumbnail URL.
const TRACK_SECTIONS: [&str; 2] = ["artists", "extraartists"];

/// A parsed field-removal path: `key` or `key/subkey`, one nesting level max.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    key: String,
    subkey: Option<String>,
}

impl FieldPath {
    /// Parse a dotted-path string from the removal list.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split('/');
        let key = parts.next().unwrap_or_default();
        let subkey = parts.next();

        if key.is_empty() || subkey.is_some_and(str::is_empty) || parts.next().is_some() {
            return Err(AppError::config(format!(
                "invalid removal path {raw:?}: expected \"key\" or \"key/subkey\""
            )));
        }

        Ok(Self {
            key: key.to_string(),
            subkey: subkey.map(str::to_string),
        })
    }
}

/// Parse the configured removal list, preserving order.
pub fn parse_removals(raw: &[String]) -> Result<Vec<FieldPath>> {
    raw.iter().map(|s| FieldPath::parse(s)).collect()
}

/// Strip configured fields and thumbnail URLs from a release.
///
/// Absent fields are a no-op, not an error: the removal list is written
/// against the richest shape a release can have, and most releases only
/// carry a subset of it.
pub fn normalize(mut record: Value, removals: &[FieldPath], strip_thumbnails: bool) -> Value {
    if let Some(map) = record.as_object_mut() {
        for path in removals {
            remove_path(map, path);
        }

        if strip_thumbnails {
            for section in THUMBNAIL_SECTIONS {
                strip_section(map, section);
            }
            if let Some(Value::Array(tracks)) = map.get_mut("tracklist") {
                for track in tracks {
                    if let Some(track) = track.as_object_mut() {
                        for section in TRACK_SECTIONS {
                            strip_section(track, section);
                        }
                    }
                }
            }
        }
    }
    record
}

/// Serialize a record deterministically (sorted keys, fixed indentation).
pub fn to_canonical_bytes(record: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(record)?)
}

fn remove_path(map: &mut Map<String, Value>, path: &FieldPath) {
    match &path.subkey {
        None => {
            map.remove(&path.key);
        }
        Some(subkey) => match map.get_mut(&path.key) {
            Some(Value::Array(entries)) => {
                for entry in entries {
                    if let Some(entry) = entry.as_object_mut() {
                        entry.remove(subkey);
                    }
                }
            }
            Some(Value::Object(inner)) => {
                inner.remove(subkey);
            }
            _ => {}
        },
    }
}

fn strip_section(map: &mut Map<String, Value>, section: &str) {
    if let Some(Value::Array(entries)) = map.get_mut(section) {
        for entry in entries {
            if let Some(entry) = entry.as_object_mut() {
                entry.remove(THUMBNAIL_FIELD);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn removals(paths: &[&str]) -> Vec<FieldPath> {
        parse_removals(&paths.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn removes_listed_field_and_nested_thumbnails() {
        let record = json!({
            "id": 42,
            "title": "X",
            "thumbnail_url": "t",
            "artists": [{"name": "A", "thumbnail_url": "u"}],
        });

        let out = normalize(record, &removals(&["title"]), true);

        // Top-level thumbnail_url survives: stripping only touches the known
        // nested collections.
        assert_eq!(
            out,
            json!({
                "artists": [{"name": "A"}],
                "id": 42,
                "thumbnail_url": "t",
            })
        );
    }

    #[test]
    fn removal_is_path_scoped() {
        let record = json!({
            "id": 1,
            "labels": [{"name": "L", "thumbnail_url": "x"}],
            "companies": [{"name": "C", "thumbnail_url": "y"}],
        });

        let out = normalize(record, &removals(&["labels/thumbnail_url"]), false);

        assert_eq!(out["labels"], json!([{"name": "L"}]));
        assert_eq!(out["companies"], json!([{"name": "C", "thumbnail_url": "y"}]));
    }

    #[test]
    fn absent_fields_are_a_no_op() {
        let record = json!({"id": 1});
        let out = normalize(
            record,
            &removals(&["missing", "also_missing/subkey"]),
            true,
        );
        assert_eq!(out, json!({"id": 1}));
    }

    #[test]
    fn strips_tracklist_artist_thumbnails() {
        let record = json!({
            "id": 7,
            "tracklist": [
                {
                    "position": "A1",
                    "artists": [{"name": "A", "thumbnail_url": "u"}],
                    "extraartists": [{"name": "B", "thumbnail_url": "v"}],
                },
                {"position": "A2"},
            ],
        });

        let out = normalize(record, &[], true);

        assert_eq!(out["tracklist"][0]["artists"], json!([{"name": "A"}]));
        assert_eq!(out["tracklist"][0]["extraartists"], json!([{"name": "B"}]));
        assert_eq!(out["tracklist"][1], json!({"position": "A2"}));
    }

    #[test]
    fn serialization_is_deterministic_across_key_order() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": {"y": 2, "x": 3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 3, "y": 2}, "b": 1}"#).unwrap();

        assert_eq!(
            to_canonical_bytes(&a).unwrap(),
            to_canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn rejects_paths_with_more_than_one_level() {
        assert!(FieldPath::parse("a/b/c").is_err());
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("a/").is_err());
        assert!(FieldPath::parse("videos").is_ok());
        assert!(FieldPath::parse("labels/thumbnail_url").is_ok());
    }
}
