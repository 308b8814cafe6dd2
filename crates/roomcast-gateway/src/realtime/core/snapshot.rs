//! Snapshot file: `{ "<sid>": SessionRecord, ... }`, written wholesale.
//!
//! Records are decoded one by one so a single malformed entry is skipped
//! without discarding the rest of the file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use roomcast_core::protocol::SessionRecord;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot not found: {0}")]
    NotFound(PathBuf),
    #[error("snapshot parse failed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("snapshot io failed: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decoded file content.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub records: BTreeMap<String, SessionRecord>,
    /// Keys whose value did not decode as a record.
    pub skipped: Vec<String>,
}

pub fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SnapshotError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(SnapshotError::Io(e)),
    };
    parse(&raw)
}

pub fn parse(raw: &str) -> Result<Snapshot, SnapshotError> {
    let entries: BTreeMap<String, Value> = serde_json::from_str(raw).map_err(SnapshotError::Parse)?;

    let mut snap = Snapshot::default();
    for (key, value) in entries {
        match serde_json::from_value::<SessionRecord>(value) {
            Ok(rec) => {
                snap.records.insert(key, rec);
            }
            Err(e) => {
                tracing::warn!(sid = %key, error = %e, "skipping malformed snapshot record");
                snap.skipped.push(key);
            }
        }
    }
    Ok(snap)
}

/// Replace the file at `path` with `records`, creating parent directories.
pub fn save(path: &Path, records: &BTreeMap<String, SessionRecord>) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string(records).map_err(SnapshotError::Encode)?;
    fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(sid: &str, uid: Option<&str>) -> SessionRecord {
        SessionRecord {
            sid: sid.into(),
            last_active_ts: 100.0,
            is_alive: true,
            uid: uid.map(str::to_string),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("sessions.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound(_)));
    }

    #[test]
    fn truncated_file_is_parse_error() {
        let err = parse(r#"{"s1": {"sid": "s1", "last_act"#).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }

    #[test]
    fn malformed_record_is_skipped() {
        let raw = r#"{
            "s1": {"sid": "s1", "last_active_ts": 1.5, "is_alive": false, "uid": "u1"},
            "s2": {"sid": "s2", "is_alive": "maybe"},
            "s3": 7
        }"#;
        let snap = parse(raw).unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records["s1"].uid.as_deref(), Some("u1"));
        assert_eq!(snap.skipped, vec!["s2".to_string(), "s3".to_string()]);
    }

    #[test]
    fn save_creates_directory_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("sessions.json");

        let mut records = BTreeMap::new();
        records.insert("s1".to_string(), rec("s1", Some("u1")));
        records.insert("s2".to_string(), rec("s2", None));
        save(&path, &records).unwrap();

        records.remove("s2");
        save(&path, &records).unwrap();

        let snap = load(&path).unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records["s1"], rec("s1", Some("u1")));

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["s1"]["sid"], "s1");
        assert_eq!(raw["s1"]["uid"], "u1");
    }
}
