use crate::app::ports::QueuePort;
use crate::config::PollConfig;
use crate::domain::{BatchReport, MessageOutcome, RawMessage, RunSummary};
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::pipeline::persist::SqliteStore;
use crate::pipeline::transform::process_message;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    IdleAccumulating,
    Active,
    Terminated,
}

/// Idle time accumulated since the last non-empty fetch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdleState {
    idle: Duration,
}

impl IdleState {
    pub fn elapsed(&self) -> Duration {
        self.idle
    }

    pub fn reset(&mut self) {
        self.idle = Duration::ZERO;
    }

    pub fn accumulate(&mut self, by: Duration) {
        self.idle += by;
    }

    pub fn reached(&self, ceiling: Duration) -> bool {
        self.idle >= ceiling
    }
}

/// Drives fetch, transform and persist until the idle ceiling is reached.
///
/// Owns the queue client and the store connection; both are released when
/// the controller is dropped, whichever way the run ends.
pub struct PollController<Q: QueuePort> {
    queue: Q,
    store: SqliteStore,
    config: PollConfig,
    state: PollState,
    idle: IdleState,
    summary: RunSummary,
}

impl<Q: QueuePort> PollController<Q> {
    pub fn new(queue: Q, store: SqliteStore, config: PollConfig) -> Self {
        Self {
            queue,
            store,
            config,
            state: PollState::IdleAccumulating,
            idle: IdleState::default(),
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn idle(&self) -> Duration {
        self.idle.elapsed()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// One fetch cycle without the trailing sleep. Returns the new state.
    pub async fn poll_once(&mut self) -> Result<PollState> {
        self.summary.polls += 1;
        let messages = self.fetch().await?;
        PipelineMetrics::record_fetch(messages.len());

        if messages.is_empty() {
            self.idle.accumulate(self.config.poll_interval());
            self.state = PollState::IdleAccumulating;
            info!(
                idle_secs = self.idle.elapsed().as_secs(),
                "No messages found, retrying in {}s",
                self.config.poll_interval_secs
            );
        } else {
            self.state = PollState::Active;
            let report = self.process_batch(&messages);
            self.summary.absorb(&report);
            self.idle.reset();
        }
        PipelineMetrics::set_idle(self.idle.elapsed());

        if self.idle.reached(self.config.idle_ceiling()) {
            info!(
                idle_secs = self.idle.elapsed().as_secs(),
                "Max idle time reached, stopping"
            );
            self.state = PollState::Terminated;
        }
        self.summary.final_idle = self.idle.elapsed();
        Ok(self.state)
    }

    async fn fetch(&mut self) -> Result<Vec<RawMessage>> {
        let fetched = self
            .queue
            .fetch(
                self.config.max_batch,
                self.config.visibility_timeout_secs,
                self.config.poll_wait_secs,
            )
            .await;
        match fetched {
            Ok(messages) => Ok(messages),
            Err(e) if self.config.fetch_fail_soft => {
                error!("Error fetching messages from queue: {}", e);
                PipelineMetrics::record_fetch_error();
                self.summary.fetch_errors += 1;
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Transforms every message in transport order and persists the
    /// accepted records as one transaction.
    pub fn process_batch(&mut self, messages: &[RawMessage]) -> BatchReport {
        let span = info_span!("batch", size = messages.len());
        let _enter = span.enter();

        let mut report = BatchReport {
            fetched: messages.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(messages.len());

        for message in messages {
            debug!(message_id = %message.message_id, receipt_handle = %message.receipt_handle, "Processing message");
            match process_message(message) {
                MessageOutcome::Accepted(record) => {
                    PipelineMetrics::record_message("accepted");
                    records.push(record);
                }
                MessageOutcome::Rejected { reason, .. } => {
                    PipelineMetrics::record_message(reason.label());
                    report.record_rejection(&reason);
                }
            }
        }
        report.accepted = records.len();

        let started = Instant::now();
        match self.store.persist(&records) {
            Ok(rows) => {
                report.rows_persisted = rows;
                report.committed = true;
                PipelineMetrics::record_commit(rows, started.elapsed());
                info!(
                    rows,
                    rejected = report.rejected(),
                    "Batch committed to the database"
                );
            }
            Err(e) => {
                PipelineMetrics::record_rollback();
                error!(
                    accepted = report.accepted,
                    "Batch rolled back, not retrying: {}", e
                );
            }
        }
        report
    }

    /// Loops until terminated without releasing resources.
    pub async fn drive(&mut self) -> Result<RunSummary> {
        while self.poll_once().await? != PollState::Terminated {
            tokio::time::sleep(self.config.poll_interval()).await;
        }
        Ok(self.summary.clone())
    }

    /// Runs to termination, then releases the queue client and the store.
    #[instrument(skip(self), name = "poll_loop")]
    pub async fn run(mut self) -> Result<RunSummary> {
        let outcome = self.drive().await;
        let PollController { queue, store, .. } = self;
        drop(queue);
        let closed = store.close();
        let summary = outcome?;
        closed?;
        info!(
            polls = summary.polls,
            batches = summary.batches,
            rows = summary.rows_persisted,
            rejected = summary.messages_rejected,
            failed_batches = summary.failed_batches,
            "Ingestion finished"
        );
        Ok(summary)
    }
}
