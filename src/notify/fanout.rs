//! Broadcast fan-out: page, dedupe, chunk, dispatch, collect receipts, prune.
//!
//! A broadcast never fails. Registry errors end the walk early, a failed
//! chunk counts as zero deliveries, and receipt errors only skip pruning for
//! that batch. Everything is logged.

use crate::client::http::PushProvider;
use crate::config::RollcallConfig;
use crate::notify::token::{is_push_token, PushDestination, TokenRegistry};
use crate::protocol::models::{PushMessage, PushTicket};
use crate::RollcallError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Tuning knobs for one engine.
#[derive(Debug, Clone)]
pub struct FanoutSettings {
    /// Registry page size.
    pub page_size: usize,
    /// Messages per provider send request.
    pub chunk_size: usize,
    /// Ticket ids per receipt request.
    pub receipt_chunk_size: usize,
    /// Concurrent chunk sends.
    pub concurrency: usize,
    /// Delay multiplied by chunk index before each send.
    pub stagger: Duration,
}

impl FanoutSettings {
    /// Take the fan-out fields from a service configuration.
    pub fn from_config(config: &RollcallConfig) -> Self {
        Self {
            page_size: config.registry_page_size,
            chunk_size: config.provider_chunk_size,
            receipt_chunk_size: config.receipt_chunk_size,
            concurrency: config.send_concurrency,
            stagger: config.chunk_stagger,
        }
    }
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self::from_config(&RollcallConfig::default())
    }
}

/// What one broadcast did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Registry entries read.
    pub seen: usize,
    /// Messages handed to the provider (unique, syntactically valid tokens).
    pub attempted: usize,
    /// Messages the provider accepted with a ticket.
    pub accepted: usize,
    /// Chunks whose send failed outright.
    pub failed_chunks: usize,
    /// Registry entries removed as unregistered.
    pub pruned: usize,
}

/// Keep the first occurrence of each valid token not already in `seen`.
///
/// `seen` spans the whole broadcast so a token repeated across pages is
/// sent once.
pub fn dedupe_destinations(
    page: Vec<PushDestination>,
    seen: &mut HashSet<String>,
) -> Vec<String> {
    page.into_iter()
        .filter(|destination| is_push_token(&destination.token))
        .filter_map(|destination| {
            if seen.insert(destination.token.clone()) {
                Some(destination.token)
            } else {
                None
            }
        })
        .collect()
}

type ChunkResult = (usize, Vec<PushMessage>, Result<Vec<PushTicket>, RollcallError>);

/// Sends one announcement to every registered destination.
pub struct FanoutEngine {
    registry: Arc<dyn TokenRegistry>,
    provider: Arc<dyn PushProvider>,
    settings: FanoutSettings,
}

impl FanoutEngine {
    /// Create an engine over a registry and provider.
    pub fn new(
        registry: Arc<dyn TokenRegistry>,
        provider: Arc<dyn PushProvider>,
        settings: FanoutSettings,
    ) -> Self {
        Self {
            registry,
            provider,
            settings,
        }
    }

    /// Broadcast `title`/`body` to every registered destination.
    pub async fn broadcast(&self, title: &str, body: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut seen = HashSet::new();
        let mut ticket_tokens: HashMap<String, String> = HashMap::new();
        let mut cursor: Option<String> = None;
        let mut next_chunk = 0usize;

        loop {
            let page = match self
                .registry
                .page(cursor.as_deref(), self.settings.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, "token registry page failed; ending broadcast");
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            report.seen += page.len();
            cursor = page.last().map(|destination| destination.user_id.clone());

            let tokens = dedupe_destinations(page, &mut seen);
            next_chunk = self
                .dispatch(&tokens, title, body, next_chunk, &mut report, &mut ticket_tokens)
                .await;
        }

        self.collect_receipts(&ticket_tokens, &mut report).await;

        tracing::info!(
            title,
            seen = report.seen,
            attempted = report.attempted,
            accepted = report.accepted,
            failed_chunks = report.failed_chunks,
            pruned = report.pruned,
            "broadcast complete"
        );
        report
    }

    /// Send `tokens` in provider-sized chunks. Returns the next chunk index.
    async fn dispatch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        first_chunk: usize,
        report: &mut BroadcastReport,
        ticket_tokens: &mut HashMap<String, String>,
    ) -> usize {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut set: JoinSet<ChunkResult> = JoinSet::new();
        let mut next_chunk = first_chunk;

        for (offset, chunk) in tokens.chunks(self.settings.chunk_size).enumerate() {
            let messages: Vec<PushMessage> = chunk
                .iter()
                .map(|token| PushMessage::new(token, title, body))
                .collect();
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let delay = self
                .settings
                .stagger
                .saturating_mul(u32::try_from(offset).unwrap_or(u32::MAX));
            let index = first_chunk + offset;
            next_chunk = index + 1;

            set.spawn(async move {
                tokio::time::sleep(delay).await;
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    let closed = RollcallError::Internal("send semaphore closed".to_string());
                    return (index, messages, Err(closed));
                };
                let result = provider.send(&messages).await;
                (index, messages, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, messages, Ok(tickets))) => {
                    report.attempted += messages.len();
                    for (message, ticket) in messages.into_iter().zip(tickets) {
                        if ticket.is_unregistered() {
                            self.prune(&message.to, report).await;
                            continue;
                        }
                        match ticket {
                            PushTicket::Ok { id } => {
                                report.accepted += 1;
                                ticket_tokens.insert(id, message.to);
                            }
                            PushTicket::Error { message: reason, .. } => {
                                tracing::debug!(
                                    chunk = index,
                                    token = %message.to,
                                    reason = ?reason,
                                    "push rejected"
                                );
                            }
                        }
                    }
                }
                Ok((index, messages, Err(e))) => {
                    report.attempted += messages.len();
                    report.failed_chunks += 1;
                    tracing::warn!(
                        chunk = index,
                        size = messages.len(),
                        error = %e,
                        "push chunk failed"
                    );
                }
                Err(e) => {
                    report.failed_chunks += 1;
                    tracing::error!(error = %e, "push chunk task aborted");
                }
            }
        }
        next_chunk
    }

    async fn collect_receipts(
        &self,
        ticket_tokens: &HashMap<String, String>,
        report: &mut BroadcastReport,
    ) {
        let ids: Vec<String> = ticket_tokens.keys().cloned().collect();
        for batch in ids.chunks(self.settings.receipt_chunk_size) {
            let receipts = match self.provider.receipts(batch).await {
                Ok(receipts) => receipts,
                Err(e) => {
                    tracing::warn!(count = batch.len(), error = %e, "receipt fetch failed");
                    continue;
                }
            };
            for (id, receipt) in receipts {
                if !receipt.is_unregistered() {
                    continue;
                }
                match ticket_tokens.get(&id) {
                    Some(token) => self.prune(token, report).await,
                    None => tracing::debug!(ticket = %id, "receipt for unknown ticket"),
                }
            }
        }
    }

    async fn prune(&self, token: &str, report: &mut BroadcastReport) {
        match self.registry.remove_token(token).await {
            Ok(removed) => {
                report.pruned += removed;
                tracing::info!(token, removed, "pruned unregistered push token");
            }
            Err(e) => tracing::warn!(token, error = %e, "failed to prune push token"),
        }
    }
}
