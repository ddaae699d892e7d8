//! Read-only view of students owned by the identity collaborator.

use crate::RollcallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// What the attendance core needs to know about a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
    /// Stable identifier issued by the identity service.
    pub id: String,

    /// Cohort/batch tag, matched against session batches.
    pub batch: String,

    /// Registered Ed25519 public key (hex or base64), if any.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Stored reference photo (URL or base64), if any.
    #[serde(default)]
    pub reference_photo: Option<String>,
}

impl StudentIdentity {
    /// Create an identity with no verification credentials.
    pub fn new(id: impl Into<String>, batch: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            batch: batch.into(),
            public_key: None,
            reference_photo: None,
        }
    }
}

/// Lookup interface onto the identity collaborator.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Fetch a student by id.
    async fn student(&self, id: &str) -> Result<Option<StudentIdentity>, RollcallError>;
}

/// In-process directory, used when identities are pushed in by the host.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    students: RwLock<HashMap<String, StudentIdentity>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory from a JSON array of identities.
    ///
    /// # Errors
    /// `ConfigError` if the file cannot be read or parsed.
    pub fn load_json(path: &Path) -> Result<Self, RollcallError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RollcallError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let students: Vec<StudentIdentity> = serde_json::from_str(&raw).map_err(|e| {
            RollcallError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let directory = Self::new();
        for student in students {
            directory.upsert(student)?;
        }
        Ok(directory)
    }

    /// Insert or replace a student.
    pub fn upsert(&self, student: StudentIdentity) -> Result<(), RollcallError> {
        let mut guard = self
            .students
            .write()
            .map_err(|_| RollcallError::Internal("identity directory lock poisoned".to_string()))?;
        guard.insert(student.id.clone(), student);
        Ok(())
    }
}

#[async_trait]
impl IdentityDirectory for MemoryDirectory {
    async fn student(&self, id: &str) -> Result<Option<StudentIdentity>, RollcallError> {
        let guard = self
            .students
            .read()
            .map_err(|_| RollcallError::Internal("identity directory lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let directory = MemoryDirectory::new();
        let mut student = StudentIdentity::new("stu-1", "43");
        directory.upsert(student.clone()).unwrap();

        assert_eq!(directory.student("stu-1").await.unwrap(), Some(student.clone()));
        assert_eq!(directory.student("stu-2").await.unwrap(), None);

        student.public_key = Some("abc".to_string());
        directory.upsert(student.clone()).unwrap();
        assert_eq!(
            directory.student("stu-1").await.unwrap().unwrap().public_key,
            Some("abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("students.json");
        std::fs::write(
            &path,
            r#"[{"id": "stu-1", "batch": "43", "publicKey": "ab"}, {"id": "stu-2", "batch": "44"}]"#,
        )
        .unwrap();

        let directory = MemoryDirectory::load_json(&path).unwrap();
        let student = directory.student("stu-1").await.unwrap().unwrap();
        assert_eq!(student.public_key.as_deref(), Some("ab"));
        assert!(directory.student("stu-2").await.unwrap().is_some());

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            MemoryDirectory::load_json(&path),
            Err(RollcallError::ConfigError(_))
        ));
    }
}
