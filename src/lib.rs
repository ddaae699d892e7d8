//! # Rollcall
//!
//! **Geofenced, identity-verified class attendance with push fan-out.**
//!
//! Teachers open timed class sessions, students check in, and a check-in is
//! accepted only if the student is inside the session geofence and passes
//! identity verification. Session transitions are broadcast to every
//! registered mobile device through a bounded fan-out engine that prunes
//! dead push tokens from delivery receipts.
//!
//! ## Features
//!
//! - **Explicit session state machine** - `closed -> open -> closed`, serialized per session
//! - **Gated check-in pipeline** - shape, session state, geofence, verification, unique insert
//! - **Pluggable verification** - Ed25519 signature, remote face match, or deferred review
//! - **Non-blocking notifications** - bounded queue, worker pool, chunked concurrent sends
//! - **Self-healing token registry** - `DeviceNotRegistered` tickets and receipts prune tokens
//!
//! ## Quickstart
//!
//! ```no_run
//! use rollcall::{server, RollcallConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rollcall::RollcallError> {
//!     let config = RollcallConfig::from_env()?;
//!     server::serve(config).await
//! }
//! ```
//!
//! ## Configuration
//!
//! - `ROLLCALL_GEOFENCE_RADIUS_M` - containment radius (default 100 m)
//! - `ROLLCALL_VERIFICATION` - `signature`, `face-match`, or `deferred`
//! - `ROLLCALL_PUSH_URL` - push provider base URL
//!
//! See [`RollcallConfig`] for the full list.

#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Domain layer
pub mod geo;
pub mod identity;
pub mod ledger;
pub mod session;

// Crypto layer
pub mod crypto;

// Verification layer
pub mod evidence;
pub mod verification;

// Protocol and client layer
pub mod client;
pub mod protocol;

// Notification layer
pub mod notify;

// Policy layer
pub mod policy;

// Services
pub mod attendance;
pub mod manager;

// HTTP surface
pub mod server;

// Re-exports for public API
pub use attendance::{AttendanceService, MarkAttendanceRequest};
pub use clock::{Clock, SystemClock};
pub use config::{RollcallConfig, VerificationStrategy};
pub use errors::RollcallError;
pub use geo::GeoPoint;
pub use ledger::{AttendanceRecord, AttendanceStatus};
pub use manager::SessionManager;
pub use session::{ClassSession, SessionState};
pub use verification::{Evidence, VerificationOutcome};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
