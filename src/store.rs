// Report persistence collaborator
//
// Stores re-check the record invariants on every write and use the record's
// `revision` for optimistic concurrency: a save built from an outdated
// snapshot is rejected with `StaleRecord` instead of overwriting.

use async_trait::async_trait;
use fd_lock::RwLock;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::workflow::{ReportId, ReportRecord, WorkflowError};

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Fetch the authoritative copy of a record
    async fn load(&self, id: &ReportId) -> Result<ReportRecord, WorkflowError>;

    /// Store a brand new record. Fails if the id is already taken.
    async fn insert(&self, record: ReportRecord) -> Result<ReportRecord, WorkflowError>;

    /// Commit an updated record. `record.revision` must match the stored
    /// revision; the returned copy carries the next revision.
    async fn save(&self, record: ReportRecord) -> Result<ReportRecord, WorkflowError>;

    async fn list(&self) -> Result<Vec<ReportRecord>, WorkflowError>;
}

/// Invariants every store enforces regardless of what the caller validated
pub fn check_invariants(
    previous: Option<&ReportRecord>,
    next: &ReportRecord,
    max_changes: u32,
) -> Result<(), WorkflowError> {
    let violation = |detail: String| WorkflowError::InvariantViolation {
        id: next.id.clone(),
        detail,
    };

    if next.status_change_count > max_changes {
        return Err(violation(format!(
            "status change count {} exceeds maximum {}",
            next.status_change_count, max_changes
        )));
    }
    if next.violations.is_empty() {
        return Err(violation("violation list is empty".to_string()));
    }

    if let Some(previous) = previous {
        if previous.kind != next.kind {
            return Err(violation(format!(
                "kind changed from {} to {}",
                previous.kind, next.kind
            )));
        }
        if next.notice_number < previous.notice_number {
            return Err(violation(format!(
                "notice number went backwards from {} to {}",
                previous.notice_number, next.notice_number
            )));
        }
        if next.status_change_count < previous.status_change_count {
            return Err(violation(format!(
                "status change count went backwards from {} to {}",
                previous.status_change_count, next.status_change_count
            )));
        }
        if next.status != previous.status
            && next.status_change_count <= previous.status_change_count
        {
            return Err(violation(
                "status changed without consuming a status change".to_string(),
            ));
        }
    }

    Ok(())
}

fn stale(record: &ReportRecord, stored: &ReportRecord) -> WorkflowError {
    WorkflowError::StaleRecord {
        id: record.id.clone(),
        expected: record.revision,
        found: stored.revision,
    }
}

/// Process-local store, mainly for tests and embedding
#[derive(Debug)]
pub struct InMemoryReportStore {
    records: tokio::sync::RwLock<HashMap<ReportId, ReportRecord>>,
    max_changes: u32,
}

impl InMemoryReportStore {
    pub fn new(max_changes: u32) -> Self {
        Self {
            records: tokio::sync::RwLock::new(HashMap::new()),
            max_changes,
        }
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn load(&self, id: &ReportId) -> Result<ReportRecord, WorkflowError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))
    }

    async fn insert(&self, mut record: ReportRecord) -> Result<ReportRecord, WorkflowError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(WorkflowError::InvariantViolation {
                id: record.id.clone(),
                detail: "a report with this id already exists".to_string(),
            });
        }
        check_invariants(None, &record, self.max_changes)?;

        record.revision = 1;
        records.insert(record.id.clone(), record.clone());
        debug!(report_id = %record.id, "Report inserted");
        Ok(record)
    }

    async fn save(&self, mut record: ReportRecord) -> Result<ReportRecord, WorkflowError> {
        let mut records = self.records.write().await;
        let stored = records
            .get(&record.id)
            .ok_or_else(|| WorkflowError::NotFound(record.id.clone()))?;

        if stored.revision != record.revision {
            warn!(
                report_id = %record.id,
                expected = record.revision,
                found = stored.revision,
                "Rejecting save from stale snapshot"
            );
            return Err(stale(&record, stored));
        }
        check_invariants(Some(stored), &record, self.max_changes)?;

        record.revision += 1;
        records.insert(record.id.clone(), record.clone());
        debug!(report_id = %record.id, revision = record.revision, "Report saved");
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ReportRecord>, WorkflowError> {
        let mut all: Vec<_> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

/// Advisory lock file guarding writes to a store directory
const LOCK_FILE_NAME: &str = ".store.lock";

/// One JSON document per report under a directory.
///
/// Writers take an OS file lock on the directory's lock file for the whole
/// read-check-rename sequence, so separate processes sharing the directory
/// still get `StaleRecord` instead of silently overwriting each other.
#[derive(Debug)]
pub struct FileReportStore {
    directory: PathBuf,
    max_changes: u32,
}

impl FileReportStore {
    pub fn new<P: AsRef<Path>>(directory: P, max_changes: u32) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            max_changes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Run `f` on a blocking thread while holding the directory write lock
    async fn with_write_lock<T, F>(&self, f: F) -> Result<T, WorkflowError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, WorkflowError> + Send + 'static,
    {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&directory)?;
            let lock_file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(directory.join(LOCK_FILE_NAME))?;
            let mut lock = RwLock::new(lock_file);
            let _guard = lock.write()?;
            f(&directory)
        })
        .await
        .map_err(|e| WorkflowError::Storage(format!("store task failed: {e}")))?
    }
}

fn record_path(directory: &Path, id: &ReportId) -> Result<PathBuf, WorkflowError> {
    let safe = !id.as_str().is_empty()
        && id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !safe {
        return Err(WorkflowError::Storage(format!(
            "report id '{id}' is not usable as a file name"
        )));
    }
    Ok(directory.join(format!("{id}.json")))
}

fn read_locked(path: &Path) -> Result<Option<ReportRecord>, WorkflowError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write to a temp file unique to this writer, then rename over the record
fn write_locked(path: &Path, record: &ReportRecord) -> Result<(), WorkflowError> {
    let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
    std::fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn load(&self, id: &ReportId) -> Result<ReportRecord, WorkflowError> {
        let path = record_path(&self.directory, id)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WorkflowError::NotFound(id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, record: ReportRecord) -> Result<ReportRecord, WorkflowError> {
        let max_changes = self.max_changes;
        let record = self
            .with_write_lock(move |directory| {
                let mut record = record;
                let path = record_path(directory, &record.id)?;
                if read_locked(&path)?.is_some() {
                    return Err(WorkflowError::InvariantViolation {
                        id: record.id.clone(),
                        detail: "a report with this id already exists".to_string(),
                    });
                }
                check_invariants(None, &record, max_changes)?;

                record.revision = 1;
                write_locked(&path, &record)?;
                Ok(record)
            })
            .await?;

        debug!(report_id = %record.id, path = %self.directory.display(), "Report inserted");
        Ok(record)
    }

    async fn save(&self, record: ReportRecord) -> Result<ReportRecord, WorkflowError> {
        let max_changes = self.max_changes;
        let record = self
            .with_write_lock(move |directory| {
                let mut record = record;
                let path = record_path(directory, &record.id)?;
                let stored = read_locked(&path)?
                    .ok_or_else(|| WorkflowError::NotFound(record.id.clone()))?;

                if stored.revision != record.revision {
                    warn!(
                        report_id = %record.id,
                        expected = record.revision,
                        found = stored.revision,
                        "Rejecting save from stale snapshot"
                    );
                    return Err(stale(&record, &stored));
                }
                check_invariants(Some(&stored), &record, max_changes)?;

                record.revision += 1;
                write_locked(&path, &record)?;
                Ok(record)
            })
            .await?;

        debug!(report_id = %record.id, revision = record.revision, "Report saved");
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ReportRecord>, WorkflowError> {
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path).await?;
            records.push(serde_json::from_str::<ReportRecord>(&contents)?);
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}
