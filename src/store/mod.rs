//! Versioned record store contract.
//!
//! The store is a key-value map from company number to [`CompanyRecord`]
//! guarded by an optimistic version counter. Writers read, modify, then
//! compare-and-swap against the version they read; a mismatch is reported as
//! [`WriteOutcome::VersionConflict`] and never as an error, so the caller
//! decides whether to retry.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::CompanyRecord;

pub use memory::InMemoryRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Write applied; carries the version now stored.
    Written(u64),
    /// Another writer got there first (or the record vanished / appeared).
    VersionConflict,
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, company_number: &str) -> Result<Option<CompanyRecord>>;

    /// Inserts a record that must not exist yet.
    async fn insert(&self, record: CompanyRecord) -> Result<WriteOutcome>;

    /// Replaces the stored record if its version still equals
    /// `expected_version`. Legacy records without a version match 0.
    async fn compare_and_swap(
        &self,
        record: CompanyRecord,
        expected_version: u64,
    ) -> Result<WriteOutcome>;

    /// Returns `true` when a record was removed.
    async fn delete(&self, company_number: &str) -> Result<bool>;

    async fn find_by_parent(&self, parent_company_number: &str) -> Result<Vec<CompanyRecord>>;

    /// Inserts `shell` unless a record with the same id exists, and returns
    /// whichever record is stored afterwards. Check and insert are atomic.
    async fn ensure_exists(&self, shell: CompanyRecord) -> Result<CompanyRecord>;
}
