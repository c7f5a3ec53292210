//! One-shot messages shown on the next rendered page.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

/// A message queued in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    /// CSS modifier used by the layout.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            Level::Success => "flash-success",
            Level::Info => "flash-info",
            Level::Warning => "flash-warning",
            Level::Error => "flash-error",
        }
    }
}

/// Queue a message for the next page.
///
/// Session failures are logged and otherwise ignored: losing a notice must
/// not fail the request that produced it.
pub async fn push(session: &Session, level: Level, text: impl Into<String>) {
    let mut pending: Vec<FlashMessage> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(FlashMessage {
        level,
        text: text.into(),
    });

    if let Err(e) = session.insert(session_keys::FLASH, &pending).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Remove and return all queued messages.
pub async fn take(session: &Session) -> Vec<FlashMessage> {
    session
        .remove::<Vec<FlashMessage>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_take_drains_in_order() {
        let session = session();
        push(&session, Level::Success, "Added to cart").await;
        push(&session, Level::Warning, "Only 2 left").await;

        let messages = take(&session).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "Added to cart");
        assert_eq!(messages[1].css_class(), "flash-warning");

        assert!(take(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_take_without_messages() {
        assert!(take(&session()).await.is_empty());
    }
}
