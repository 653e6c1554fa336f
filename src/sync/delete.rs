use tracing::{error, info};

use super::CompanySyncService;
use crate::delta::{DeltaAt, ensure_fresh};
use crate::error::{Result, SyncError};
use crate::model::CompanyRecord;

impl CompanySyncService {
    /// Deletes a company in response to a delete delta stamped `delta_at`.
    ///
    /// The store delete commits first. Parent cleanup and the deleted
    /// notification follow; if either fails the error is returned but the
    /// record stays deleted.
    pub async fn delete_profile(
        &self,
        company_number: &str,
        delta_at: DeltaAt,
        context_id: &str,
    ) -> Result<CompanyRecord> {
        let existing = self.require(company_number).await?;
        ensure_fresh(company_number, delta_at, existing.delta_at).inspect_err(|_| {
            info!(company_number, delta_at = %delta_at, "rejected stale delete delta");
        })?;

        let removed = self
            .bounded("delete", company_number, self.store.delete(company_number))
            .await?;
        if !removed {
            return Err(SyncError::not_found(company_number));
        }
        info!(company_number, context_id, "company profile deleted");

        let cleanup = match existing.parent_company_number.as_deref() {
            Some(parent) => self.release_parent(company_number, parent, context_id).await,
            None => Ok(()),
        };

        let notified = self
            .notifier
            .notify_deleted(context_id, company_number, &existing.profile)
            .await
            .inspect_err(|err| {
                error!(company_number, context_id, error = %err, "deleted notification failed");
            });

        cleanup.and(notified)?;
        Ok(existing)
    }
}
