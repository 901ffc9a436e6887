//! Append-only ledger of verification records for one run.

use crate::record::VerificationRecord;

/// Records in the order they were verified. There is no way to edit or remove an entry;
/// the engine is the only writer.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    records: Vec<VerificationRecord>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: VerificationRecord) {
        tracing::debug!(name = record.name(), url = record.url(), "ledger append");
        self.records.push(record);
    }

    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<VerificationRecord> {
        self.records
    }
}

/// Counters for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages_requested: usize,
    pub pages_verified: usize,
    pub resources_discovered: usize,
    pub resources_verified: usize,
    pub resources_skipped: usize,
}
