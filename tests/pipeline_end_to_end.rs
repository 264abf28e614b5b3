use anyhow::Result;
use async_trait::async_trait;
use login_ingest::app::ports::QueuePort;
use login_ingest::config::PollConfig;
use login_ingest::domain::RawMessage;
use login_ingest::pipeline::{mask, PollController, SqliteStore};
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::tempdir;

const SAMPLE: &str = r#"{"user_id":"u1","device_type":"mobile","ip":"1.2.3.4","device_id":"d1","app_version":"2.5.0","locale":"en-US"}"#;

struct ScriptedQueue {
    script: Mutex<VecDeque<Vec<RawMessage>>>,
}

impl ScriptedQueue {
    fn new(script: Vec<Vec<RawMessage>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl QueuePort for ScriptedQueue {
    async fn fetch(
        &self,
        _max_count: u32,
        _visibility_timeout: u32,
        _wait_seconds: u32,
    ) -> login_ingest::error::Result<Vec<RawMessage>> {
        Ok(self.script.lock().unwrap().pop_front().unwrap_or_default())
    }
}

fn message(id: &str, body: &str) -> RawMessage {
    RawMessage {
        message_id: id.to_string(),
        receipt_handle: format!("rh-{id}"),
        body: body.to_string(),
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

fn short_idle() -> PollConfig {
    PollConfig {
        poll_interval_secs: 5,
        idle_ceiling_secs: 10,
        ..PollConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn sample_message_is_masked_and_stored() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("user_logins.db");

    let queue = ScriptedQueue::new(vec![vec![message("m1", SAMPLE)]]);
    let store = SqliteStore::open(&db_path)?;
    let before = today();
    let summary = PollController::new(queue, store, short_idle()).run().await?;
    let after = today();

    assert_eq!(summary.rows_persisted, 1);
    assert_eq!(summary.messages_rejected, 0);

    // run() closed the connection; read back through a fresh one.
    let store = SqliteStore::open(&db_path)?;
    let rows = store.rows()?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.user_id, "u1");
    assert_eq!(row.device_type, "mobile");
    assert_eq!(row.locale, "en-US");
    assert_eq!(row.app_version, 2);
    assert_eq!(row.masked_ip, mask("1.2.3.4"));
    assert_eq!(row.masked_device_id, mask("d1"));
    assert!(
        row.create_date == before || row.create_date == after,
        "{} not in [{before}, {after}]",
        row.create_date
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn batches_are_persisted_in_fetch_order() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("user_logins.db");

    let body = |user: &str, version: &str| {
        serde_json::json!({
            "user_id": user, "device_type": "web", "ip": "8.8.8.8",
            "device_id": format!("dev-{user}"), "app_version": version, "locale": "de-DE"
        })
        .to_string()
    };
    let queue = ScriptedQueue::new(vec![
        vec![
            message("m1", &body("a", "1.0")),
            message("m2", r#"{"user_id":"nope"}"#),
            message("m3", &body("b", "3.2.1")),
        ],
        vec![],
        vec![message("m4", &body("c", "10"))],
    ]);

    let store = SqliteStore::open(&db_path)?;
    let summary = PollController::new(queue, store, short_idle()).run().await?;
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.rows_persisted, 3);
    assert_eq!(summary.messages_rejected, 1);

    let rows = SqliteStore::open(&db_path)?.rows()?;
    let got: Vec<(String, i64)> = rows.into_iter().map(|r| (r.user_id, r.app_version)).collect();
    assert_eq!(
        got,
        vec![("a".to_string(), 1), ("b".to_string(), 3), ("c".to_string(), 10)]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_queue_exits_after_idle_ceiling() -> Result<()> {
    let queue = ScriptedQueue::new(vec![]);
    let store = SqliteStore::open_in_memory()?;
    let started = tokio::time::Instant::now();

    let summary = PollController::new(queue, store, PollConfig::default()).run().await?;

    assert_eq!(summary.polls, 18);
    assert_eq!(summary.batches, 0);
    assert_eq!(started.elapsed(), std::time::Duration::from_secs(85));
    Ok(())
}
