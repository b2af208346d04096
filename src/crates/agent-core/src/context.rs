//! Bounded conversation context.
//!
//! Grounded on `orchestrator::context::manager::ContextManager`'s shape
//! (a shared, lock-guarded turn list with a separately-held system slot),
//! adapted from token-count trimming to a plain entry-count cap.

use std::sync::Arc;

use llm::Message;
use tokio::sync::RwLock;

/// Default cap on non-system turns held by a `ConversationContext`.
pub const DEFAULT_CAPACITY: usize = 20;

/// Per-agent bounded ordered sequence of turns. The system-prompt slot is
/// held separately from the ring of turns and is never evicted.
#[derive(Clone)]
pub struct ConversationContext {
    system_prompt: Arc<RwLock<Option<Message>>>,
    turns: Arc<RwLock<Vec<Message>>>,
    capacity: usize,
}

impl ConversationContext {
    pub fn new(capacity: usize) -> Self {
        Self {
            system_prompt: Arc::new(RwLock::new(None)),
            turns: Arc::new(RwLock::new(Vec::new())),
            capacity,
        }
    }

    pub async fn set_system_prompt(&self, content: impl Into<String>) {
        *self.system_prompt.write().await = Some(Message::system(content.into()));
    }

    /// Appends a turn, evicting the oldest non-system turn if the cap is exceeded.
    pub async fn push(&self, message: Message) {
        let mut turns = self.turns.write().await;
        turns.push(message);
        while turns.len() > self.capacity {
            turns.remove(0);
        }
    }

    /// The full prompt for a chat call: system slot (if set) followed by
    /// the bounded turn window, oldest first.
    pub async fn render(&self) -> Vec<Message> {
        let mut out = Vec::new();
        if let Some(system) = self.system_prompt.read().await.clone() {
            out.push(system);
        }
        out.extend(self.turns.read().await.iter().cloned());
        out
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.turns.write().await.clear();
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
