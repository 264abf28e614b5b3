use crate::app::ports::QueuePort;
use crate::config::QueueConfig;
use crate::domain::RawMessage;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const AMZ_JSON: &str = "application/x-amz-json-1.0";
const RECEIVE_TARGET: &str = "AmazonSQS.ReceiveMessage";

// Slack on top of the long-poll wait before the HTTP call itself times out.
const REQUEST_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReceiveMessageRequest<'a> {
    queue_url: &'a str,
    max_number_of_messages: u32,
    visibility_timeout: u32,
    wait_time_seconds: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReceiveMessageResponse {
    #[serde(default)]
    messages: Vec<SqsMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SqsMessage {
    message_id: String,
    receipt_handle: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct SqsErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// SQS-compatible queue client speaking the AWS JSON 1.0 protocol.
///
/// Requests are unsigned, which LocalStack-style endpoints accept.
pub struct SqsQueue {
    client: reqwest::Client,
    endpoint: String,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(config: &QueueConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            queue_url: config.queue_url.clone(),
        })
    }
}

/// Maps a ReceiveMessage response body into raw messages, in queue order.
pub fn parse_receive_response(body: &str) -> Result<Vec<RawMessage>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: ReceiveMessageResponse = serde_json::from_str(body)
        .map_err(|e| IngestError::Queue(format!("malformed ReceiveMessage response: {e}")))?;
    Ok(parsed
        .messages
        .into_iter()
        .map(|m| RawMessage {
            message_id: m.message_id,
            receipt_handle: m.receipt_handle,
            body: m.body,
        })
        .collect())
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<SqsErrorBody>(body) {
        Ok(err) if !err.kind.is_empty() || !err.message.is_empty() => {
            format!("{} {}: {}", status.as_u16(), err.kind, err.message)
        }
        _ => format!("{} {}", status.as_u16(), body.trim()),
    }
}

#[async_trait]
impl QueuePort for SqsQueue {
    async fn fetch(
        &self,
        max_count: u32,
        visibility_timeout: u32,
        wait_seconds: u32,
    ) -> Result<Vec<RawMessage>> {
        let request = ReceiveMessageRequest {
            queue_url: &self.queue_url,
            max_number_of_messages: max_count,
            visibility_timeout,
            wait_time_seconds: wait_seconds,
        };

        let resp = self
            .client
            .post(format!("{}/", self.endpoint))
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", RECEIVE_TARGET)
            .timeout(Duration::from_secs(wait_seconds as u64) + REQUEST_SLACK)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(IngestError::Queue(describe_error(status, &text)));
        }

        let messages = parse_receive_response(&text)?;
        debug!(count = messages.len(), queue_url = %self.queue_url, "Fetched messages");
        Ok(messages)
    }
}
