use crate::domain::RawMessage;
use crate::error::Result;
use async_trait::async_trait;

/// Queue-side port consumed by the poll controller.
#[async_trait]
pub trait QueuePort: Send + Sync {
    /// Fetch up to `max_count` messages, waiting at most `wait_seconds` for
    /// availability. Returned messages stay hidden from other consumers for
    /// `visibility_timeout` seconds.
    async fn fetch(
        &self,
        max_count: u32,
        visibility_timeout: u32,
        wait_seconds: u32,
    ) -> Result<Vec<RawMessage>>;
}
