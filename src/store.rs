//! Record persistence.
//!
//! The batch controller only needs one operation: save a record and learn
//! whether it was stored or already existed. [`RecordStore`] is that seam.
//! Two implementations ship with the crate:
//!
//! * [`HttpRecordStore`] — the registration backend (`POST /upload`, or
//!   `POST /sheets/{id}/records` when grouping records into a sheet).
//! * [`JsonlRecordStore`] — an append-only local file, one JSON record per
//!   line, for offline runs.
//!
//! A duplicate is a normal outcome, not an error.

use crate::error::StoreError;
use crate::record::ChildRecord;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// What happened to a record handed to [`RecordStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// The store already holds this record; nothing was written.
    Duplicate,
}

/// Destination for extracted records.
pub trait RecordStore: Send + Sync {
    fn save(
        &self,
        record: &ChildRecord,
    ) -> impl Future<Output = Result<SaveStatus, StoreError>> + Send;
}

impl<S: RecordStore> RecordStore for std::sync::Arc<S> {
    fn save(
        &self,
        record: &ChildRecord,
    ) -> impl Future<Output = Result<SaveStatus, StoreError>> + Send {
        (**self).save(record)
    }
}

// ── HTTP backend ─────────────────────────────────────────────────────────────

/// Posts camelCase JSON records to the registration backend.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecordStore {
    /// `base_url` is the backend root, e.g. `http://localhost:5000`.
    pub fn new(
        base_url: &str,
        sheet_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint_for(base_url, sheet_id),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_for(base_url: &str, sheet_id: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match sheet_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => format!("{base}/sheets/{id}/records"),
        None => format!("{base}/upload"),
    }
}

/// Classify a backend response.
///
/// 409 → duplicate. Other non-2xx → error. A 2xx body of
/// `{"duplicate": true}` → duplicate; `{"ok": false}` → error. Bodies that
/// are not JSON are accepted as saved.
fn classify(status: StatusCode, body: String) -> Result<SaveStatus, StoreError> {
    if status == StatusCode::CONFLICT {
        return Ok(SaveStatus::Duplicate);
    }
    if !status.is_success() {
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) else {
        return Ok(SaveStatus::Saved);
    };
    if json.get("duplicate").and_then(|v| v.as_bool()) == Some(true) {
        return Ok(SaveStatus::Duplicate);
    }
    if json.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(SaveStatus::Saved)
}

impl RecordStore for HttpRecordStore {
    async fn save(&self, record: &ChildRecord) -> Result<SaveStatus, StoreError> {
        let response = self.client.post(&self.endpoint).json(record).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!("POST {} → {}", self.endpoint, status);
        classify(status, body)
    }
}

// ── JSONL file ───────────────────────────────────────────────────────────────

struct JsonlState {
    keys: HashSet<String>,
    file: tokio::fs::File,
}

/// Appends records to a local JSON-lines file.
///
/// Duplicates are detected by child number (case-insensitive), or by name
/// plus date of birth when the child number is missing. Records with
/// neither are always appended.
pub struct JsonlRecordStore {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlRecordStore {
    /// Open (or create) `path`, indexing any records already in it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut keys = HashSet::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(existing) => {
                for (n, line) in existing.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ChildRecord>(line) {
                        Ok(record) => keys.extend(dedup_key(&record)),
                        Err(e) => warn!("{}:{}: skipping unreadable line: {}", path.display(), n + 1, e),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        debug!("Opened {} ({} existing records)", path.display(), keys.len());
        Ok(Self {
            path,
            state: Mutex::new(JsonlState { keys, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn dedup_key(record: &ChildRecord) -> Option<String> {
    let number = record.child_number.trim();
    if !number.is_empty() {
        return Some(format!("no:{}", number.to_lowercase()));
    }
    let name = record.name.trim();
    if !name.is_empty() {
        return Some(format!(
            "nd:{}|{}",
            name.to_lowercase(),
            record.date_of_birth.trim()
        ));
    }
    None
}

impl RecordStore for JsonlRecordStore {
    async fn save(&self, record: &ChildRecord) -> Result<SaveStatus, StoreError> {
        let key = dedup_key(record);
        let mut state = self.state.lock().await;

        if let Some(ref k) = key {
            if state.keys.contains(k) {
                return Ok(SaveStatus::Duplicate);
            }
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        state.file.write_all(line.as_bytes()).await?;
        state.file.flush().await?;

        if let Some(k) = key {
            state.keys.insert(k);
        }
        Ok(SaveStatus::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, number: &str, dob: &str) -> ChildRecord {
        ChildRecord {
            name: name.into(),
            child_number: number.into(),
            date_of_birth: dob.into(),
            ..Default::default()
        }
    }

    #[test]
    fn endpoint_with_and_without_sheet() {
        assert_eq!(endpoint_for("http://h:5000/", None), "http://h:5000/upload");
        assert_eq!(
            endpoint_for("http://h:5000", Some("abc")),
            "http://h:5000/sheets/abc/records"
        );
        assert_eq!(endpoint_for("http://h", Some("  ")), "http://h/upload");
    }

    #[test]
    fn classify_responses() {
        assert_eq!(
            classify(StatusCode::CONFLICT, String::new()).unwrap(),
            SaveStatus::Duplicate
        );
        assert_eq!(
            classify(StatusCode::OK, r#"{"ok":true,"data":{}}"#.into()).unwrap(),
            SaveStatus::Saved
        );
        assert_eq!(
            classify(StatusCode::OK, r#"{"ok":true,"duplicate":true}"#.into()).unwrap(),
            SaveStatus::Duplicate
        );
        assert_eq!(
            classify(StatusCode::CREATED, "created".into()).unwrap(),
            SaveStatus::Saved
        );
        let err = classify(StatusCode::BAD_REQUEST, "no json received".into()).unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 400, .. }));
        assert!(classify(StatusCode::OK, r#"{"ok":false}"#.into()).is_err());
    }

    #[tokio::test]
    async fn jsonl_detects_duplicates_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let store = JsonlRecordStore::open(&path).await.unwrap();
        assert_eq!(store.save(&record("Ravi", "HAC-1", "")).await.unwrap(), SaveStatus::Saved);
        assert_eq!(
            store.save(&record("Someone Else", "hac-1", "")).await.unwrap(),
            SaveStatus::Duplicate
        );
        assert_eq!(
            store.save(&record("Sita", "", "01 Jan 2015")).await.unwrap(),
            SaveStatus::Saved
        );
        drop(store);

        let store = JsonlRecordStore::open(&path).await.unwrap();
        assert_eq!(
            store.save(&record("sita", "", "01 Jan 2015")).await.unwrap(),
            SaveStatus::Duplicate
        );
        let lines = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(lines.lines().count(), 2);
    }

    #[tokio::test]
    async fn jsonl_keyless_records_always_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRecordStore::open(dir.path().join("r.jsonl")).await.unwrap();
        let blank = ChildRecord::default();
        assert_eq!(store.save(&blank).await.unwrap(), SaveStatus::Saved);
        assert_eq!(store.save(&blank).await.unwrap(), SaveStatus::Saved);
    }
}
