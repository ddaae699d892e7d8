//! Rollcall configuration.

use crate::RollcallError;
use std::path::PathBuf;
use std::time::Duration;

/// Which identity verification strategy a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStrategy {
    /// Ed25519 signature over a caller-supplied payload.
    Signature,
    /// Remote comparison of a captured photo against the stored reference.
    FaceMatch,
    /// Store the evidence and leave the outcome pending review.
    Deferred,
}

impl std::str::FromStr for VerificationStrategy {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signature" => Ok(Self::Signature),
            "face-match" | "face_match" | "facematch" => Ok(Self::FaceMatch),
            "deferred" => Ok(Self::Deferred),
            other => Err(RollcallError::ConfigError(format!(
                "unknown verification strategy: {}",
                other
            ))),
        }
    }
}

/// Configuration for the attendance service.
#[derive(Debug, Clone)]
pub struct RollcallConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,

    /// Maximum distance in meters between student and session location.
    pub geofence_radius_m: f64,

    /// Active verification strategy.
    pub verification: VerificationStrategy,

    /// Base URL of the face matching service (required for `FaceMatch`).
    pub face_match_url: Option<String>,

    /// Upper bound on a single verification call.
    pub verification_timeout: Duration,

    /// Where deferred-review evidence is written.
    /// Defaults to `dirs::data_dir()/rollcall/evidence`.
    pub evidence_dir: Option<PathBuf>,

    /// JSON file of student identities loaded at startup.
    pub students_file: Option<PathBuf>,

    /// Base URL of the push provider.
    pub push_base_url: String,

    /// Timeout for each push provider request.
    pub push_timeout: Duration,

    /// Token registry page size while walking destinations.
    pub registry_page_size: usize,

    /// Maximum messages per provider send request.
    pub provider_chunk_size: usize,

    /// Maximum ticket ids per receipt request.
    pub receipt_chunk_size: usize,

    /// Maximum concurrent chunk sends within one broadcast.
    pub send_concurrency: usize,

    /// Delay multiplied by chunk index before each chunk send.
    pub chunk_stagger: Duration,

    /// Bounded notification queue capacity.
    pub queue_capacity: usize,

    /// Number of fan-out workers draining the queue.
    pub notify_workers: usize,
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            geofence_radius_m: 100.0,
            verification: VerificationStrategy::Signature,
            face_match_url: None,
            verification_timeout: Duration::from_secs(10),
            evidence_dir: None,
            students_file: None,
            push_base_url: "https://exp.host".to_string(),
            push_timeout: Duration::from_secs(15),
            registry_page_size: 1000,
            provider_chunk_size: 100,
            receipt_chunk_size: 300,
            send_concurrency: 4,
            chunk_stagger: Duration::from_millis(100),
            queue_capacity: 64,
            notify_workers: 2,
        }
    }
}

impl RollcallConfig {
    /// Build a configuration from `ROLLCALL_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, RollcallError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RollcallError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("ROLLCALL_BIND") {
            config.bind_addr = addr;
        }
        if let Some(radius) = lookup("ROLLCALL_GEOFENCE_RADIUS_M") {
            config.geofence_radius_m = parse_var("ROLLCALL_GEOFENCE_RADIUS_M", &radius)?;
        }
        if let Some(strategy) = lookup("ROLLCALL_VERIFICATION") {
            config.verification = strategy.parse()?;
        }
        config.face_match_url = lookup("ROLLCALL_FACE_MATCH_URL");
        if let Some(secs) = lookup("ROLLCALL_VERIFICATION_TIMEOUT_SECS") {
            config.verification_timeout =
                Duration::from_secs(parse_var("ROLLCALL_VERIFICATION_TIMEOUT_SECS", &secs)?);
        }
        config.evidence_dir = lookup("ROLLCALL_EVIDENCE_DIR").map(PathBuf::from);
        config.students_file = lookup("ROLLCALL_STUDENTS_FILE").map(PathBuf::from);
        if let Some(url) = lookup("ROLLCALL_PUSH_URL") {
            config.push_base_url = url;
        }
        if let Some(secs) = lookup("ROLLCALL_PUSH_TIMEOUT_SECS") {
            config.push_timeout = Duration::from_secs(parse_var("ROLLCALL_PUSH_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = lookup("ROLLCALL_PUSH_CONCURRENCY") {
            config.send_concurrency = parse_var("ROLLCALL_PUSH_CONCURRENCY", &n)?;
        }
        if let Some(n) = lookup("ROLLCALL_QUEUE_CAPACITY") {
            config.queue_capacity = parse_var("ROLLCALL_QUEUE_CAPACITY", &n)?;
        }
        if let Some(n) = lookup("ROLLCALL_NOTIFY_WORKERS") {
            config.notify_workers = parse_var("ROLLCALL_NOTIFY_WORKERS", &n)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), RollcallError> {
        if !self.geofence_radius_m.is_finite() || self.geofence_radius_m <= 0.0 {
            return Err(RollcallError::ConfigError(format!(
                "geofence_radius_m must be positive, got {}",
                self.geofence_radius_m
            )));
        }
        if self.verification == VerificationStrategy::FaceMatch
            && self.face_match_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(RollcallError::ConfigError(
                "face_match_url is required for the face-match strategy".to_string(),
            ));
        }
        let sizes = [
            ("registry_page_size", self.registry_page_size),
            ("provider_chunk_size", self.provider_chunk_size),
            ("receipt_chunk_size", self.receipt_chunk_size),
            ("send_concurrency", self.send_concurrency),
            ("queue_capacity", self.queue_capacity),
            ("notify_workers", self.notify_workers),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(RollcallError::ConfigError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        let timeouts = [
            ("verification_timeout", self.verification_timeout),
            ("push_timeout", self.push_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(RollcallError::ConfigError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Resolve the evidence directory, falling back to the platform data dir.
    pub fn resolved_evidence_dir(&self) -> Result<PathBuf, RollcallError> {
        match &self.evidence_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|base| base.join("rollcall").join("evidence"))
                .ok_or_else(|| {
                    RollcallError::ConfigError("Could not find data directory".to_string())
                }),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, RollcallError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| RollcallError::ConfigError(format!("{}: {}", key, e)))
}
