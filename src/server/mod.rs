//! HTTP surface and service wiring.

pub mod auth;
pub mod handlers;
pub mod response;

use crate::attendance::AttendanceService;
use crate::client::http::{ExpoClient, PushProvider};
use crate::clock::{Clock, SystemClock};
use crate::config::RollcallConfig;
use crate::identity::{IdentityDirectory, MemoryDirectory};
use crate::ledger::MemoryLedger;
use crate::manager::SessionManager;
use crate::notify::{
    spawn_workers, FanoutEngine, FanoutSettings, MemoryTokenRegistry, Notifier, NotifyWorkers,
    TokenRegistry,
};
use crate::session::MemorySessionStore;
use crate::verification::build_verifier;
use crate::RollcallError;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Session state machine.
    pub sessions: Arc<SessionManager>,
    /// Check-in pipeline and queries.
    pub attendance: Arc<AttendanceService>,
    /// Push token registry.
    pub tokens: Arc<dyn TokenRegistry>,
    /// Announcement queue.
    pub notifier: Notifier,
}

/// Build the router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/attendance/start", post(handlers::start_class))
        .route("/attendance/end", post(handlers::end_class))
        .route("/attendance/mark", post(handlers::mark_attendance))
        .route("/attendance/student", get(handlers::student_history))
        .route("/attendance/class/:session_id", get(handlers::class_roster))
        .route("/schedule", get(handlers::teacher_sessions))
        .route("/schedule/create", post(handlers::create_session))
        .route("/schedule/student", get(handlers::cohort_sessions))
        .route("/schedule/edit/:session_id", put(handlers::update_session))
        .route("/schedule/delete/:session_id", delete(handlers::delete_session))
        .route("/schedule/:session_id", get(handlers::get_session))
        .route("/users/push-token", post(handlers::register_push_token))
        .route("/notices/announce", post(handlers::announce))
        .with_state(state)
}

/// A fully wired service.
pub struct App {
    /// HTTP routes.
    pub router: Router,
    /// Fan-out workers; they stop once the router and its state are dropped.
    pub workers: NotifyWorkers,
    /// Token registry shared with the fan-out engine.
    pub tokens: Arc<MemoryTokenRegistry>,
    /// Attendance ledger.
    pub ledger: Arc<MemoryLedger>,
}

impl App {
    /// Wire the service from configuration.
    ///
    /// Students are loaded from `students_file` when set. Must be called
    /// inside a Tokio runtime; the fan-out workers start immediately.
    ///
    /// # Errors
    /// `ConfigError` for invalid settings, an unreadable students file, or a
    /// verification strategy that cannot be constructed.
    pub fn build(config: &RollcallConfig) -> Result<Self, RollcallError> {
        let directory = match &config.students_file {
            Some(path) => MemoryDirectory::load_json(path)?,
            None => MemoryDirectory::new(),
        };
        let provider = ExpoClient::new(&config.push_base_url, config.push_timeout)?;
        Self::with_parts(config, Arc::new(directory), Arc::new(provider), Arc::new(SystemClock))
    }

    /// Wire the service around explicit collaborators.
    pub fn with_parts(
        config: &RollcallConfig,
        directory: Arc<dyn IdentityDirectory>,
        provider: Arc<dyn PushProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RollcallError> {
        config.validate()?;

        let tokens = Arc::new(MemoryTokenRegistry::new());
        let engine = Arc::new(FanoutEngine::new(
            tokens.clone(),
            provider,
            FanoutSettings::from_config(config),
        ));
        let (notifier, workers) =
            spawn_workers(engine, config.queue_capacity, config.notify_workers);

        let sessions = Arc::new(SessionManager::with_clock(
            Arc::new(MemorySessionStore::new()),
            directory.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(MemoryLedger::new());
        let attendance = Arc::new(AttendanceService::with_clock(
            sessions.clone(),
            directory,
            build_verifier(config, clock.clone())?,
            ledger.clone(),
            config,
            clock,
        ));

        let state = AppState {
            sessions,
            attendance,
            tokens: tokens.clone(),
            notifier,
        };
        Ok(Self {
            router: router(state),
            workers,
            tokens,
            ledger,
        })
    }
}

/// Bind, serve until the listener fails, then drain the notification queue.
pub async fn serve(config: RollcallConfig) -> Result<(), RollcallError> {
    let App { router, workers, .. } = App::build(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| {
            RollcallError::ConfigError(format!("Failed to bind {}: {}", config.bind_addr, e))
        })?;
    tracing::info!(addr = %config.bind_addr, strategy = ?config.verification, "rollcall listening");

    let served = axum::serve(listener, router)
        .await
        .map_err(|e| RollcallError::Internal(format!("Server error: {}", e)));
    workers.join().await;
    served
}
