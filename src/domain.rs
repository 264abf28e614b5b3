use std::time::Duration;

/// A message as handed over by the queue transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub message_id: String,
    /// Lease handle for acknowledgment; the pipeline only logs it.
    pub receipt_handle: String,
    pub body: String,
}

/// Decoded login event body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub user_id: String,
    pub device_type: String,
    pub ip: String,
    pub device_id: String,
    pub app_version: String,
    pub locale: String,
}

/// Row destined for `user_logins`. `create_date` is stamped by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistableRecord {
    pub user_id: String,
    pub device_type: String,
    pub masked_ip: String,
    pub masked_device_id: String,
    pub locale: String,
    pub app_version_major: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Decode(String),
    Validation { missing: Vec<&'static str> },
    Transform(String),
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::Decode(_) => "decode",
            RejectReason::Validation { .. } => "validation",
            RejectReason::Transform(_) => "transform",
        }
    }
}

/// Per-message result of decode, validate and transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Accepted(PersistableRecord),
    Rejected {
        message_id: String,
        reason: RejectReason,
    },
}

/// What happened to one fetched batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub accepted: usize,
    pub decode_failures: usize,
    pub validation_failures: usize,
    pub transform_failures: usize,
    pub rows_persisted: usize,
    pub committed: bool,
}

impl BatchReport {
    pub fn rejected(&self) -> usize {
        self.decode_failures + self.validation_failures + self.transform_failures
    }

    pub fn record_rejection(&mut self, reason: &RejectReason) {
        match reason {
            RejectReason::Decode(_) => self.decode_failures += 1,
            RejectReason::Validation { .. } => self.validation_failures += 1,
            RejectReason::Transform(_) => self.transform_failures += 1,
        }
    }
}

/// Totals for a whole run of the poll loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub polls: u64,
    pub batches: u64,
    pub failed_batches: u64,
    pub fetch_errors: u64,
    pub rows_persisted: u64,
    pub messages_rejected: u64,
    pub final_idle: Duration,
}

impl RunSummary {
    pub fn absorb(&mut self, report: &BatchReport) {
        self.batches += 1;
        if !report.committed {
            self.failed_batches += 1;
        }
        self.rows_persisted += report.rows_persisted as u64;
        self.messages_rejected += report.rejected() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_report_counts_rejections_by_reason() {
        let mut report = BatchReport::default();
        report.record_rejection(&RejectReason::Decode("eof".into()));
        report.record_rejection(&RejectReason::Validation { missing: vec!["ip"] });
        report.record_rejection(&RejectReason::Validation { missing: vec!["locale"] });

        assert_eq!(report.decode_failures, 1);
        assert_eq!(report.validation_failures, 2);
        assert_eq!(report.transform_failures, 0);
        assert_eq!(report.rejected(), 3);
    }

    #[test]
    fn run_summary_tracks_failed_batches() {
        let mut summary = RunSummary::default();
        summary.absorb(&BatchReport {
            fetched: 3,
            accepted: 2,
            validation_failures: 1,
            rows_persisted: 2,
            committed: true,
            ..Default::default()
        });
        summary.absorb(&BatchReport {
            fetched: 1,
            accepted: 1,
            committed: false,
            ..Default::default()
        });

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.rows_persisted, 2);
        assert_eq!(summary.messages_rejected, 1);
    }
}
