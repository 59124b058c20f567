//! Broker client contract (C2): publish one message, consume from an offset, report
//! the current end-offset. The real broker (partitioning, replication, durability) is
//! out of scope (see spec §1 Non-goals); this crate defines the contract the
//! subscription/topic services are written against plus an in-memory reference
//! implementation good enough to drive the gateway end-to-end in tests.

mod error;
mod in_memory;

pub use error::{BrokerError, BrokerResult};
pub use in_memory::InMemoryBroker;

use async_trait::async_trait;

/// The largest payload the broker will accept, in bytes.
pub const MAX_MESSAGE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// The natural batch size a single `Consume` call returns at most.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    /// Broker-assigned message id.
    pub message_id: String,
    /// Echoes the fully-qualified topic the message was published to.
    pub topic: String,
    /// Partition the message landed on (always `0` for the in-memory broker).
    pub partition: i32,
    /// Offset assigned to the message within the topic.
    pub offset: i64,
}

/// A single message as returned by `consume`, together with the offset it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// The message's offset within the topic.
    pub offset: i64,
    /// Raw message bytes.
    pub payload: Vec<u8>,
}

/// The broker contract every topic/subscription operation that touches the data
/// plane is written against.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publishes one message to `full_topic` (the fully-qualified `projects/P/topics/T`
    /// name). Fails with `BrokerError::PayloadTooLarge` if `message` exceeds
    /// `MAX_MESSAGE_SIZE_BYTES`.
    async fn publish(&self, full_topic: &str, message: &[u8]) -> BrokerResult<PublishAck>;

    /// Consumes up to `MAX_BATCH_SIZE` messages starting at `from_offset`. Returns an
    /// empty vec immediately if `return_immediately` is true and nothing is available;
    /// otherwise may block up to a broker-defined window waiting for data to arrive.
    async fn consume(
        &self,
        full_topic: &str,
        from_offset: i64,
        return_immediately: bool,
    ) -> BrokerResult<Vec<BrokerMessage>>;

    /// The current end-offset (one past the last published message) for `full_topic`.
    /// Used at subscription creation to start consumption at "now".
    async fn get_offset(&self, full_topic: &str) -> BrokerResult<i64>;
}
