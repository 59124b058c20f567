//! An in-memory, per-topic append-only log standing in for the real broker.
//!
//! Mirrors the shape of the teacher's `SqsQueue<T>` (a thin generic wrapper around one
//! storage primitive) but models a Kafka-like offset log instead of a work queue: each
//! topic is a `Vec` that only ever grows, and `consume` slices from an offset rather
//! than destructively dequeuing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{BrokerClient, BrokerError, BrokerMessage, BrokerResult, PublishAck, MAX_BATCH_SIZE, MAX_MESSAGE_SIZE_BYTES};

/// How long a blocking `consume` (`return_immediately == false`) waits for data before
/// giving up and returning an empty batch, matching spec §4.2's "may block up to a
/// broker-defined window" contract.
const BLOCK_WINDOW: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Default)]
struct TopicLog {
    messages: Vec<Vec<u8>>,
}

/// In-memory reference implementation of [`BrokerClient`].
#[derive(Default)]
pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, TopicLog>>,
    next_message_id: AtomicI64,
}

impl InMemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrokerClient for InMemoryBroker {
    async fn publish(&self, full_topic: &str, message: &[u8]) -> BrokerResult<PublishAck> {
        if message.len() > MAX_MESSAGE_SIZE_BYTES {
            return Err(BrokerError::PayloadTooLarge);
        }

        let mut topics = self.topics.lock().await;
        let log = topics.entry(full_topic.to_string()).or_default();
        let offset = i64::try_from(log.messages.len()).expect("offset fits in i64");
        log.messages.push(message.to_vec());

        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);

        Ok(PublishAck {
            message_id: message_id.to_string(),
            topic: full_topic.to_string(),
            partition: 0,
            offset,
        })
    }

    async fn consume(
        &self,
        full_topic: &str,
        from_offset: i64,
        return_immediately: bool,
    ) -> BrokerResult<Vec<BrokerMessage>> {
        let deadline = Instant::now() + BLOCK_WINDOW;

        loop {
            let batch = {
                let topics = self.topics.lock().await;
                self.slice(&topics, full_topic, from_offset)
            };

            if !batch.is_empty() || return_immediately || Instant::now() >= deadline {
                return Ok(batch);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn get_offset(&self, full_topic: &str) -> BrokerResult<i64> {
        let topics = self.topics.lock().await;
        let len = topics.get(full_topic).map_or(0, |log| log.messages.len());
        Ok(i64::try_from(len).expect("offset fits in i64"))
    }
}

impl InMemoryBroker {
    fn slice(
        &self,
        topics: &HashMap<String, TopicLog>,
        full_topic: &str,
        from_offset: i64,
    ) -> Vec<BrokerMessage> {
        let Some(log) = topics.get(full_topic) else {
            return Vec::new();
        };
        let Ok(start) = usize::try_from(from_offset) else {
            return Vec::new();
        };

        log.messages
            .iter()
            .enumerate()
            .skip(start)
            .take(MAX_BATCH_SIZE)
            .map(|(offset, payload)| BrokerMessage {
                offset: i64::try_from(offset).expect("offset fits in i64"),
                payload: payload.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_consume_returns_messages_in_order() {
        let broker = InMemoryBroker::new();
        let topic = "projects/p/topics/t";

        let ack0 = broker.publish(topic, b"m1").await.unwrap();
        let ack1 = broker.publish(topic, b"m2").await.unwrap();
        assert_eq!(ack0.offset, 0);
        assert_eq!(ack1.offset, 1);
        assert_eq!(ack0.topic, topic);

        let batch = broker.consume(topic, 0, true).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].payload, b"m1");
        assert_eq!(batch[1].payload, b"m2");
    }

    #[tokio::test]
    async fn consume_from_a_later_offset_skips_earlier_messages() {
        let broker = InMemoryBroker::new();
        let topic = "projects/p/topics/t";
        broker.publish(topic, b"m1").await.unwrap();
        broker.publish(topic, b"m2").await.unwrap();

        let batch = broker.consume(topic, 1, true).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].offset, 1);
    }

    #[tokio::test]
    async fn consume_empty_topic_return_immediately_is_empty() {
        let broker = InMemoryBroker::new();
        let batch = broker.consume("projects/p/topics/missing", 0, true).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn publish_over_size_limit_is_rejected() {
        let broker = InMemoryBroker::new();
        let oversized = vec![0u8; MAX_MESSAGE_SIZE_BYTES + 1];
        let err = broker.publish("projects/p/topics/t", &oversized).await.unwrap_err();
        assert!(matches!(err, BrokerError::PayloadTooLarge));
    }

    #[tokio::test]
    async fn get_offset_tracks_end_of_log() {
        let broker = InMemoryBroker::new();
        let topic = "projects/p/topics/t";
        assert_eq!(broker.get_offset(topic).await.unwrap(), 0);
        broker.publish(topic, b"m1").await.unwrap();
        assert_eq!(broker.get_offset(topic).await.unwrap(), 1);
    }
}
