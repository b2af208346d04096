//! A bounded, priority-ordered FIFO: four per-priority queues dequeued
//! high-to-low, FIFO within a class.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::error::{BusError, Result};
use crate::message::{Message, Priority};

pub struct Inbox {
    capacity: usize,
    queues: Mutex<[VecDeque<Message>; 4]>,
    notify: Notify,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queues: Mutex::new(Default::default()),
            notify: Notify::new(),
        }
    }

    /// Enqueues `message`. If the inbox is at capacity: when `allow_drop`
    /// is set, the lowest-priority tail is evicted to make room only if
    /// the incoming message outranks it; otherwise (or if it doesn't
    /// outrank the tail) this fails with `BackpressureError`.
    pub async fn enqueue(&self, message: Message, allow_drop: bool) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let total: usize = queues.iter().map(|q| q.len()).sum();

        if total >= self.capacity {
            if allow_drop {
                if let Some(lowest) = queues.iter().position(|q| !q.is_empty()) {
                    if message.priority.rank() > lowest {
                        queues[lowest].pop_back();
                    } else {
                        return Err(BusError::Backpressure(message.receiver_id.unwrap_or_default()));
                    }
                } else {
                    return Err(BusError::Backpressure(message.receiver_id.unwrap_or_default()));
                }
            } else {
                return Err(BusError::Backpressure(message.receiver_id.unwrap_or_default()));
            }
        }

        queues[message.priority.rank()].push_back(message);
        drop(queues);
        self.notify.notify_one();
        Ok(())
    }

    /// Blocking dequeue: highest non-empty priority class first, FIFO within it.
    pub async fn receive(&self) -> Message {
        loop {
            {
                let mut queues = self.queues.lock().await;
                for queue in queues.iter_mut().rev() {
                    if let Some(message) = queue.pop_front() {
                        return message;
                    }
                }
            }
            self.notify.notified().await;
        }
    }

    pub async fn drain(&self) -> Vec<Message> {
        let mut queues = self.queues.lock().await;
        let mut drained = Vec::new();
        for queue in queues.iter_mut() {
            drained.extend(queue.drain(..));
        }
        drained
    }

    pub async fn len(&self) -> usize {
        self.queues.lock().await.iter().map(|q| q.len()).sum()
    }
}

pub fn new_inbox(capacity: usize) -> Arc<Inbox> {
    Arc::new(Inbox::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, Payload};

    fn msg(priority: Priority) -> Message {
        Message::new("sender", MessageKind::Inform, Payload::text("x")).with_priority(priority)
    }

    #[tokio::test]
    async fn dequeues_high_priority_before_low() {
        let inbox = Inbox::new(10);
        inbox.enqueue(msg(Priority::Low), false).await.unwrap();
        inbox.enqueue(msg(Priority::Urgent), false).await.unwrap();
        let first = inbox.receive().await;
        assert_eq!(first.priority, Priority::Urgent);
    }

    #[tokio::test]
    async fn same_priority_preserves_fifo_order() {
        let inbox = Inbox::new(10);
        inbox
            .enqueue(
                Message::new("s", MessageKind::Inform, Payload::text("first")),
                false,
            )
            .await
            .unwrap();
        inbox
            .enqueue(
                Message::new("s", MessageKind::Inform, Payload::text("second")),
                false,
            )
            .await
            .unwrap();
        assert_eq!(inbox.receive().await.payload.content, "first");
        assert_eq!(inbox.receive().await.payload.content, "second");
    }

    #[tokio::test]
    async fn full_inbox_without_drop_fails() {
        let inbox = Inbox::new(1);
        inbox.enqueue(msg(Priority::Normal), false).await.unwrap();
        let err = inbox.enqueue(msg(Priority::Normal), false).await.unwrap_err();
        assert!(matches!(err, BusError::Backpressure(_)));
    }

    #[tokio::test]
    async fn full_inbox_with_drop_evicts_lower_priority() {
        let inbox = Inbox::new(1);
        inbox.enqueue(msg(Priority::Low), true).await.unwrap();
        inbox.enqueue(msg(Priority::Urgent), true).await.unwrap();
        assert_eq!(inbox.receive().await.priority, Priority::Urgent);
    }
}
