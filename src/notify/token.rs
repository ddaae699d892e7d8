//! Token registry: user -> push destination token.

use crate::RollcallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// One (user, token) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDestination {
    /// Owning user.
    pub user_id: String,
    /// Opaque provider token.
    pub token: String,
}

/// Durable user -> token mapping.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Set or replace a user's token.
    async fn register(&self, user_id: &str, token: &str) -> Result<(), RollcallError>;

    /// Destinations ordered by user id, strictly after `after`, at most `limit`.
    async fn page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PushDestination>, RollcallError>;

    /// Unset `token` wherever it is registered. Returns how many users lost it.
    /// Removing an absent token is a no-op.
    async fn remove_token(&self, token: &str) -> Result<usize, RollcallError>;
}

/// Provider syntax rule for a push token.
///
/// Accepts `ExponentPushToken[...]`, `ExpoPushToken[...]`, or a bare
/// 8-4-4-4-12 hex identifier.
pub fn is_push_token(token: &str) -> bool {
    let bracketed = ["ExponentPushToken[", "ExpoPushToken["].iter().any(|prefix| {
        token.starts_with(prefix) && token.ends_with(']') && token.len() > prefix.len() + 1
    });
    bracketed || is_hex_uuid(token)
}

fn is_hex_uuid(token: &str) -> bool {
    let groups: Vec<&str> = token.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups.iter().zip(lengths).all(|(group, len)| {
            group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit())
        })
}

/// In-memory token registry.
#[derive(Debug, Default)]
pub struct MemoryTokenRegistry {
    tokens: RwLock<BTreeMap<String, String>>,
}

impl MemoryTokenRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any user still holds `token`.
    pub fn contains_token(&self, token: &str) -> bool {
        self.tokens
            .read()
            .map(|guard| guard.values().any(|t| t == token))
            .unwrap_or(false)
    }
}

fn poisoned() -> RollcallError {
    RollcallError::Internal("token registry lock poisoned".to_string())
}

#[async_trait]
impl TokenRegistry for MemoryTokenRegistry {
    async fn register(&self, user_id: &str, token: &str) -> Result<(), RollcallError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RollcallError::InvalidRequest("push token is required".to_string()));
        }
        let mut guard = self.tokens.write().map_err(|_| poisoned())?;
        guard.insert(user_id.to_string(), token.to_string());
        Ok(())
    }

    async fn page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PushDestination>, RollcallError> {
        use std::ops::Bound;

        let guard = self.tokens.read().map_err(|_| poisoned())?;
        let lower = match after {
            Some(user) => Bound::Excluded(user.to_string()),
            None => Bound::Unbounded,
        };
        Ok(guard
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(user_id, token)| PushDestination {
                user_id: user_id.clone(),
                token: token.clone(),
            })
            .collect())
    }

    async fn remove_token(&self, token: &str) -> Result<usize, RollcallError> {
        let mut guard = self.tokens.write().map_err(|_| poisoned())?;
        let before = guard.len();
        guard.retain(|_, t| t != token);
        Ok(before - guard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_syntax() {
        assert!(is_push_token("ExponentPushToken[xxxxxxxxxxxxxxxxxxxxxx]"));
        assert!(is_push_token("ExpoPushToken[abc]"));
        assert!(is_push_token("0ba7a0c5-1b2c-4d3e-8f90-a1b2c3d4e5f6"));
        assert!(!is_push_token("ExponentPushToken[]"));
        assert!(!is_push_token("ExponentPushToken[abc"));
        assert!(!is_push_token("fcm:abcdef"));
        assert!(!is_push_token(""));
        assert!(!is_push_token("0ba7a0c5-1b2c-4d3e-8f90"));
    }

    #[tokio::test]
    async fn test_register_replaces_token() {
        let registry = MemoryTokenRegistry::new();
        registry.register("u1", "ExpoPushToken[old]").await.unwrap();
        registry.register("u1", " ExpoPushToken[new] ").await.unwrap();
        assert!(registry.contains_token("ExpoPushToken[new]"));
        assert!(!registry.contains_token("ExpoPushToken[old]"));
        assert_eq!(registry.page(None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_empty() {
        let registry = MemoryTokenRegistry::new();
        let result = registry.register("u1", "   ").await;
        assert!(matches!(result, Err(RollcallError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_paging_walks_everything_once() {
        let registry = MemoryTokenRegistry::new();
        for i in 0..7 {
            registry
                .register(&format!("u{}", i), &format!("ExpoPushToken[{}]", i))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = registry.page(cursor.as_deref(), 3).await.unwrap();
            if page.is_empty() {
                break;
            }
            cursor = page.last().map(|d| d.user_id.clone());
            seen.extend(page.into_iter().map(|d| d.user_id));
        }
        assert_eq!(seen, vec!["u0", "u1", "u2", "u3", "u4", "u5", "u6"]);
    }

    #[tokio::test]
    async fn test_remove_token_is_idempotent() {
        let registry = MemoryTokenRegistry::new();
        registry.register("u1", "ExpoPushToken[shared]").await.unwrap();
        registry.register("u2", "ExpoPushToken[shared]").await.unwrap();
        registry.register("u3", "ExpoPushToken[other]").await.unwrap();

        assert_eq!(registry.remove_token("ExpoPushToken[shared]").await.unwrap(), 2);
        assert_eq!(registry.remove_token("ExpoPushToken[shared]").await.unwrap(), 0);
        assert!(!registry.contains_token("ExpoPushToken[shared]"));
        assert!(registry.contains_token("ExpoPushToken[other]"));
    }
}
