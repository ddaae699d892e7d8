//! Face-match strategy.
//!
//! The captured photo is decoded and spooled to a scratch file while the
//! match request is in flight. The scratch file is a `NamedTempFile`, removed
//! when it drops: on success, on a rejected match, on any error, and when
//! the surrounding timeout cancels the request.

use crate::client::matcher::MatchClient;
use crate::identity::StudentIdentity;
use crate::verification::{Evidence, IdentityVerifier, VerificationOutcome};
use crate::RollcallError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Image formats accepted for a captured photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG (`FF D8 FF`).
    Jpeg,
    /// PNG (`89 50 4E 47 0D 0A 1A 0A`).
    Png,
}

impl ImageKind {
    /// Identify an image by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else {
            None
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
        }
    }
}

/// Compares captured photos with the stored reference via a remote service.
pub struct FaceMatchVerifier {
    matcher: MatchClient,
    scratch_dir: Option<PathBuf>,
}

impl FaceMatchVerifier {
    /// Create a verifier for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RollcallError> {
        Ok(Self {
            matcher: MatchClient::new(base_url, timeout)?,
            scratch_dir: None,
        })
    }

    /// Spool captures into `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    /// Decode a base64 or data-URL photo into a scratch file.
    fn spool_capture(&self, image: &str) -> Result<NamedTempFile, RollcallError> {
        let encoded = match image.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => image,
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| RollcallError::InvalidRequest(format!("captured photo is not base64: {}", e)))?;
        let kind = ImageKind::sniff(&bytes).ok_or_else(|| {
            RollcallError::InvalidRequest("captured photo must be JPEG or PNG".to_string())
        })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("capture-").suffix(kind.extension());
        let mut file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| RollcallError::Internal(format!("Failed to create scratch file: {}", e)))?;

        file.write_all(&bytes)
            .and_then(|_| file.flush())
            .map_err(|e| RollcallError::Internal(format!("Failed to write scratch file: {}", e)))?;
        Ok(file)
    }
}

#[async_trait]
impl IdentityVerifier for FaceMatchVerifier {
    fn name(&self) -> &'static str {
        "face_match"
    }

    async fn verify(
        &self,
        session_id: Uuid,
        identity: &StudentIdentity,
        evidence: &Evidence,
    ) -> Result<VerificationOutcome, RollcallError> {
        let Evidence::Photo { image } = evidence else {
            return Err(RollcallError::InvalidRequest(
                "photo evidence is required".to_string(),
            ));
        };

        let reference = identity.reference_photo.as_deref().ok_or_else(|| {
            RollcallError::Unauthenticated("no reference photo registered for this user".to_string())
        })?;

        let capture = self.spool_capture(image)?;
        let bytes = tokio::fs::read(capture.path())
            .await
            .map_err(|e| RollcallError::Internal(format!("Failed to read scratch file: {}", e)))?;

        let matched = self.matcher.compare(reference, &STANDARD.encode(bytes)).await?;
        drop(capture);

        if !matched {
            tracing::warn!(%session_id, student_id = %identity.id, "face match rejected");
            return Err(RollcallError::VerificationFailed(
                "captured photo does not match reference".to_string(),
            ));
        }
        Ok(VerificationOutcome::Verified)
    }
}
