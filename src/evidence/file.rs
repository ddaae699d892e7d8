//! File-based evidence store.
//!
//! Stores one JSON record per attendance record under the configured
//! directory. Records are write-once: the bytes go to a temp file in the same
//! directory, which is persisted without clobbering and removed on any
//! failure.

use crate::evidence::format::EvidenceRecord;
use crate::RollcallError;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// File-based evidence store.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    /// Directory for evidence files.
    dir: PathBuf,
}

impl EvidenceStore {
    /// Create a store rooted at `dir`, creating it if needed.
    pub fn with_path(dir: PathBuf) -> Result<Self, RollcallError> {
        std::fs::create_dir_all(&dir)
            .map_err(|e| RollcallError::Internal(format!("Failed to create evidence dir: {}", e)))?;
        Ok(Self { dir })
    }

    fn record_path(&self, record_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", evidence_key(record_id)))
    }

    /// Save a record. Evidence already stored for the same attendance record
    /// is never replaced.
    ///
    /// # Errors
    /// - `Conflict` - evidence already exists for `record.record_id`
    /// - `Internal` - the file could not be written
    pub async fn save(&self, record: &EvidenceRecord) -> Result<String, RollcallError> {
        let key = evidence_key(record.record_id);
        let target_path = self.record_path(record.record_id);
        let dir = self.dir.clone();
        let json = record.to_json()?;

        // The blocking task finishes even if the caller is dropped, so the
        // temp file is always either persisted or removed.
        tokio::task::spawn_blocking(move || write_once(&dir, &target_path, json.as_bytes()))
            .await
            .map_err(|e| RollcallError::Internal(format!("Evidence write task failed: {}", e)))??;

        Ok(key)
    }

    /// Load and integrity-check the evidence behind an attendance record.
    pub async fn load(&self, record_id: Uuid) -> Result<Option<EvidenceRecord>, RollcallError> {
        let json = match fs::read_to_string(self.record_path(record_id)).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RollcallError::Internal(format!(
                    "Failed to read evidence file: {}",
                    e
                )))
            }
        };

        let record = EvidenceRecord::from_json(&json)?;
        record.verify()?;
        Ok(Some(record))
    }
}

fn write_once(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), RollcallError> {
    let mut temp = tempfile::Builder::new()
        .prefix(".evidence-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| RollcallError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| RollcallError::Internal(format!("Failed to write temp file: {}", e)))?;

    temp.persist_noclobber(target).map_err(|e| match e.error.kind() {
        ErrorKind::AlreadyExists => RollcallError::Conflict(
            "evidence already stored for this attendance record".to_string(),
        ),
        _ => RollcallError::Internal(format!("Failed to persist evidence file: {}", e.error)),
    })?;
    Ok(())
}

/// Storage key for the evidence of an attendance record.
pub fn evidence_key(record_id: Uuid) -> String {
    record_id.simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::verification::Evidence;
    use tempfile::TempDir;

    fn make_record(record_id: Uuid, image: &str) -> EvidenceRecord {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        EvidenceRecord::new(
            record_id,
            Uuid::nil(),
            "stu-1",
            Evidence::Photo {
                image: image.to_string(),
            },
            &clock,
        )
        .unwrap()
    }

    fn temp_leftovers(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = EvidenceStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let record_id = Uuid::new_v4();

        store.save(&make_record(record_id, "aGVsbG8=")).await.unwrap();

        let loaded = store.load(record_id).await.unwrap().unwrap();
        assert_eq!(loaded.record_id, record_id);
        assert_eq!(loaded.student_id, "stu-1");
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(temp_leftovers(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_save_never_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let store = EvidenceStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let record_id = Uuid::new_v4();

        store.save(&make_record(record_id, "Zmlyc3Q=")).await.unwrap();
        let second = store.save(&make_record(record_id, "c2Vjb25k")).await;
        assert!(matches!(second, Err(RollcallError::Conflict(_))));

        let loaded = store.load(record_id).await.unwrap().unwrap();
        assert_eq!(
            loaded.evidence,
            Evidence::Photo {
                image: "Zmlyc3Q=".to_string()
            }
        );
        assert_eq!(temp_leftovers(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_tampered_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = EvidenceStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let record_id = Uuid::new_v4();

        let key = store.save(&make_record(record_id, "aGVsbG8=")).await.unwrap();
        let path = temp_dir.path().join(format!("{}.json", key));
        let tampered = std::fs::read_to_string(&path).unwrap().replace("aGVsbG8=", "ZXZpbA==");
        std::fs::write(&path, tampered).unwrap();

        let result = store.load(record_id).await;
        assert!(matches!(result, Err(RollcallError::Internal(_))));
    }

    #[test]
    fn test_evidence_key_is_record_id() {
        let record_id = Uuid::new_v4();
        let key = evidence_key(record_id);
        assert_eq!(key, evidence_key(record_id));
        assert_eq!(key.len(), 32);
        assert!(!key.contains('-'));
    }
}
