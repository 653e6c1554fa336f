use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordStore, WriteOutcome};
use crate::error::{Result, SyncError};
use crate::model::CompanyRecord;

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, CompanyRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `records`, stored exactly as given
    /// (including records without a version).
    pub fn with_records(records: impl IntoIterator<Item = CompanyRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn require_version(record: &CompanyRecord) -> Result<u64> {
    record.version.ok_or_else(|| {
        SyncError::bad_request(format!("record {} must carry a version to be written", record.id))
    })
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, company_number: &str) -> Result<Option<CompanyRecord>> {
        Ok(self.records.read().await.get(company_number).cloned())
    }

    async fn insert(&self, record: CompanyRecord) -> Result<WriteOutcome> {
        let version = require_version(&record)?;
        let mut records = self.records.write().await;
        match records.entry(record.id.clone()) {
            Entry::Occupied(_) => Ok(WriteOutcome::VersionConflict),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(WriteOutcome::Written(version))
            }
        }
    }

    async fn compare_and_swap(
        &self,
        record: CompanyRecord,
        expected_version: u64,
    ) -> Result<WriteOutcome> {
        let version = require_version(&record)?;
        let mut records = self.records.write().await;
        let Some(stored) = records.get_mut(&record.id) else {
            return Ok(WriteOutcome::VersionConflict);
        };

        if stored.current_version() != expected_version {
            return Ok(WriteOutcome::VersionConflict);
        }

        *stored = record;
        Ok(WriteOutcome::Written(version))
    }

    async fn delete(&self, company_number: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(company_number).is_some())
    }

    async fn find_by_parent(&self, parent_company_number: &str) -> Result<Vec<CompanyRecord>> {
        let mut children = self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.parent_company_number.as_deref() == Some(parent_company_number))
            .cloned()
            .collect::<Vec<_>>();
        children.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(children)
    }

    async fn ensure_exists(&self, shell: CompanyRecord) -> Result<CompanyRecord> {
        require_version(&shell)?;
        let mut records = self.records.write().await;
        Ok(records.entry(shell.id.clone()).or_insert(shell).clone())
    }
}
