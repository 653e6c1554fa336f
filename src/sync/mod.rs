//! Delta-driven synchronisation engine.
//!
//! Every mutating path is a read-modify-write cycle against the
//! [`RecordStore`], committed with compare-and-swap on the record version.
//! A lost race is retried from a fresh read up to [`SyncPolicy::cas_retries`]
//! times and then reported as service-unavailable. No locks are taken and no
//! write spans more than one record.
//!
//! - [`merge`]: full-profile deltas
//! - [`links`]: single link add/remove events
//! - [`establishments`]: parent "uk-establishments" link upkeep
//! - [`delete`]: delta-stamped deletions

pub mod delete;
pub mod establishments;
pub mod links;
pub mod merge;

use std::future::Future;
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{error, warn};

use crate::config::SyncPolicy;
use crate::error::{Result, SyncError};
use crate::model::{CompanyProfile, CompanyRecord, Links};
use crate::notify::ChangeNotifier;
use crate::store::RecordStore;

pub use establishments::{
    UkEstablishment, UkEstablishmentCompanyLink, UkEstablishmentLinks, UkEstablishments,
};
pub use links::{LinkChange, apply_link_change};

#[derive(Clone)]
pub struct CompanySyncService {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn ChangeNotifier>,
    policy: SyncPolicy,
}

impl CompanySyncService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn ChangeNotifier>,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Public view of a company profile.
    pub async fn get_profile(&self, company_number: &str) -> Result<CompanyProfile> {
        Ok(self.require(company_number).await?.profile.into_public())
    }

    pub async fn get_links(&self, company_number: &str) -> Result<Links> {
        Ok(self.require(company_number).await?.profile.links)
    }

    /// Stored record exactly as persisted, for internal consumers.
    pub async fn get_record(&self, company_number: &str) -> Result<CompanyRecord> {
        self.require(company_number).await
    }

    async fn require(&self, company_number: &str) -> Result<CompanyRecord> {
        self.load(company_number)
            .await?
            .ok_or_else(|| SyncError::not_found(company_number))
    }

    async fn load(&self, company_number: &str) -> Result<Option<CompanyRecord>> {
        self.bounded("get", company_number, self.store.get(company_number))
            .await
    }

    /// Runs one store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        company_number: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match timeout(self.policy.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    company_number,
                    operation,
                    timeout_ms = self.policy.store_timeout.as_millis() as u64,
                    "store operation timed out"
                );
                Err(SyncError::unavailable(format!(
                    "store {operation} for company {company_number} timed out after {}ms",
                    self.policy.store_timeout.as_millis()
                )))
            }
        }
    }

    /// Decides whether a lost compare-and-swap gets another attempt.
    fn should_retry(&self, operation: &'static str, company_number: &str, attempt: usize) -> bool {
        if attempt > self.policy.cas_retries {
            return false;
        }
        warn!(
            company_number,
            operation,
            attempt,
            max_retries = self.policy.cas_retries,
            "lost compare-and-swap race, retrying from a fresh read"
        );
        true
    }

    fn retries_exhausted(&self, operation: &'static str, company_number: &str) -> SyncError {
        error!(
            company_number,
            operation,
            retries = self.policy.cas_retries,
            "compare-and-swap retries exhausted"
        );
        SyncError::unavailable(format!(
            "{operation} for company {company_number} lost {} concurrent update race(s)",
            self.policy.cas_retries + 1
        ))
    }

    async fn notify_changed(&self, context_id: &str, company_number: &str) -> Result<()> {
        self.notifier
            .notify_changed(context_id, company_number)
            .await
            .inspect_err(|err| {
                error!(company_number, context_id, error = %err, "changed notification failed");
            })
    }
}
