/*!
 * # Message Queue
 *
 * Topic-based work queue used for follow-up jobs that must not be lost when
 * the request that produced them fails part-way (currently: product image URL
 * writes that failed after the file was stored).
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Message queue errors
#[derive(Error, Debug)]
pub enum MessageQueueError {
    #[error("Queue is full")]
    QueueFull,
    #[error("Unknown message: {0}")]
    UnknownMessage(Uuid),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Message envelope for queue items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            timestamp: chrono::Utc::now(),
            retry_count: 0,
            max_retries: 3,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn from_payload<T: Serialize>(
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, MessageQueueError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| MessageQueueError::SerializationError(e.to_string()))?;
        Ok(Self::new(topic, value))
    }
}

/// Message queue trait for different implementations
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError>;
    /// Takes the next message of `topic`; it stays in flight until acked or nacked.
    async fn subscribe(&self, topic: &str) -> Result<Option<Message>, MessageQueueError>;
    async fn ack(&self, message_id: &Uuid) -> Result<(), MessageQueueError>;
    /// Requeues the message, or dead-letters it once its retries are spent.
    async fn nack(&self, message_id: &Uuid) -> Result<(), MessageQueueError>;
    /// Messages of `topic` waiting to be taken
    async fn pending(&self, topic: &str) -> usize;
}

#[derive(Debug, Default)]
struct QueueState {
    queues: HashMap<String, VecDeque<Message>>,
    in_flight: HashMap<Uuid, Message>,
    dead_letters: Vec<Message>,
}

/// In-memory message queue implementation
#[derive(Debug, Clone)]
pub struct InMemoryMessageQueue {
    state: Arc<Mutex<QueueState>>,
    max_size: usize,
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_max_size(1000)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            max_size,
        }
    }

    pub async fn dead_letters(&self) -> Vec<Message> {
        self.state.lock().await.dead_letters.clone()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let mut state = self.state.lock().await;
        let queue = state.queues.entry(message.topic.clone()).or_default();

        if queue.len() >= self.max_size {
            return Err(MessageQueueError::QueueFull);
        }

        queue.push_back(message);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Option<Message>, MessageQueueError> {
        let mut state = self.state.lock().await;
        let next = state.queues.get_mut(topic).and_then(VecDeque::pop_front);
        if let Some(message) = &next {
            state.in_flight.insert(message.id, message.clone());
        }
        Ok(next)
    }

    async fn ack(&self, message_id: &Uuid) -> Result<(), MessageQueueError> {
        let mut state = self.state.lock().await;
        state
            .in_flight
            .remove(message_id)
            .map(|_| ())
            .ok_or(MessageQueueError::UnknownMessage(*message_id))
    }

    async fn nack(&self, message_id: &Uuid) -> Result<(), MessageQueueError> {
        let mut state = self.state.lock().await;
        let mut message = state
            .in_flight
            .remove(message_id)
            .ok_or(MessageQueueError::UnknownMessage(*message_id))?;

        message.retry_count += 1;
        if message.retry_count > message.max_retries {
            state.dead_letters.push(message);
        } else {
            state
                .queues
                .entry(message.topic.clone())
                .or_default()
                .push_back(message);
        }
        Ok(())
    }

    async fn pending(&self, topic: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(topic).map(VecDeque::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_subscribe_ack() {
        let queue = InMemoryMessageQueue::new();
        let message = Message::new("image_url_update", serde_json::json!({"url": "/a.jpg"}));
        queue.publish(message.clone()).await.unwrap();

        let received = queue.subscribe("image_url_update").await.unwrap().unwrap();
        assert_eq!(received.id, message.id);
        queue.ack(&received.id).await.unwrap();

        assert!(queue.subscribe("image_url_update").await.unwrap().is_none());
        assert!(queue.ack(&received.id).await.is_err());
    }

    #[tokio::test]
    async fn nack_requeues_until_retries_are_spent() {
        let queue = InMemoryMessageQueue::new();
        queue
            .publish(Message::new("jobs", serde_json::Value::Null).with_max_retries(1))
            .await
            .unwrap();

        let first = queue.subscribe("jobs").await.unwrap().unwrap();
        queue.nack(&first.id).await.unwrap();
        assert_eq!(queue.pending("jobs").await, 1);

        let second = queue.subscribe("jobs").await.unwrap().unwrap();
        assert_eq!(second.retry_count, 1);
        queue.nack(&second.id).await.unwrap();

        assert_eq!(queue.pending("jobs").await, 0);
        assert_eq!(queue.dead_letters().await.len(), 1);
    }

    #[tokio::test]
    async fn deliveries_are_one_more_than_retries() {
        let queue = InMemoryMessageQueue::new();
        queue
            .publish(Message::new("jobs", serde_json::Value::Null).with_max_retries(4))
            .await
            .unwrap();

        let mut deliveries = 0;
        while let Some(message) = queue.subscribe("jobs").await.unwrap() {
            deliveries += 1;
            queue.nack(&message.id).await.unwrap();
        }
        assert_eq!(deliveries, 5);
        assert_eq!(queue.dead_letters().await.len(), 1);
    }

    #[tokio::test]
    async fn full_queue_rejects_publish() {
        let queue = InMemoryMessageQueue::with_max_size(1);
        queue
            .publish(Message::new("t", serde_json::Value::Null))
            .await
            .unwrap();
        assert!(matches!(
            queue.publish(Message::new("t", serde_json::Value::Null)).await,
            Err(MessageQueueError::QueueFull)
        ));
    }
}
