//! Flash notices shown once on the next rendered page.
//!
//! Stores and handlers queue notices as they act; the queue is appended to
//! the visitor's session when the handler finishes and drained by the next
//! page render. Draining the last notice deletes the session record, so the
//! in-memory store only holds visitors with a notice in flight.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key holding pending notices.
const NOTICES_KEY: &str = "notices";

/// Upper bound on queued notices; older ones are dropped first.
const MAX_PENDING: usize = 8;

/// Visual weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

impl NoticeKind {
    /// CSS modifier class.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "notice--success",
            Self::Error => "notice--error",
        }
    }
}

/// A one-shot message for the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub kind: NoticeKind,
}

impl Notice {
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NoticeKind::Success,
        }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NoticeKind::Error,
        }
    }
}

/// Queue notices for the next page render.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn push(
    session: &Session,
    notices: impl IntoIterator<Item = Notice>,
) -> Result<(), tower_sessions::session::Error> {
    let incoming: Vec<Notice> = notices.into_iter().collect();
    if incoming.is_empty() {
        return Ok(());
    }

    let mut pending: Vec<Notice> = session.get(NOTICES_KEY).await?.unwrap_or_default();
    pending.extend(incoming);
    if pending.len() > MAX_PENDING {
        pending.drain(..pending.len() - MAX_PENDING);
    }
    session.insert(NOTICES_KEY, pending).await
}

/// Remove and return all pending notices.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take(session: &Session) -> Result<Vec<Notice>, tower_sessions::session::Error> {
    let notices = session
        .remove::<Vec<Notice>>(NOTICES_KEY)
        .await?
        .unwrap_or_default();
    // Notices are all the session holds, so a drained session leaves the store
    if session.id().is_some() {
        session.flush().await?;
    }
    Ok(notices)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, SessionStore};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_push_then_take_drains() {
        let session = session();
        push(&session, [Notice::success("Added to cart", "Hydra Cannon")])
            .await
            .unwrap();
        push(&session, [Notice::error("Login failed", "Wrong password")])
            .await
            .unwrap();

        let notices = take(&session).await.unwrap();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].kind, NoticeKind::Error);
        assert!(take(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_take_deletes_drained_session_record() {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(None, Arc::clone(&store), None);
        push(&session, [Notice::success("Logged out", "Bye")])
            .await
            .unwrap();
        session.save().await.unwrap();
        let id = session.id().unwrap();
        assert!(store.load(&id).await.unwrap().is_some());

        assert_eq!(take(&session).await.unwrap().len(), 1);
        assert!(store.load(&id).await.unwrap().is_none());
        assert!(session.is_empty().await);
    }

    #[tokio::test]
    async fn test_queue_is_bounded() {
        let session = session();
        let many = (0..MAX_PENDING + 3).map(|i| Notice::success(format!("n{i}"), ""));
        push(&session, many).await.unwrap();

        let notices = take(&session).await.unwrap();
        assert_eq!(notices.len(), MAX_PENDING);
        assert_eq!(notices[0].title, "n3");
    }
}
