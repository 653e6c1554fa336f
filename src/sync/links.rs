use tracing::{debug, info};

use super::CompanySyncService;
use crate::error::{Result, SyncError};
use crate::etag;
use crate::model::{CompanyRecord, LinkType};
use crate::store::WriteOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Add,
    Delete,
}

impl LinkChange {
    fn operation(&self) -> &'static str {
        match self {
            Self::Add => "add_link",
            Self::Delete => "delete_link",
        }
    }
}

/// Applies `change` to `record` in memory.
///
/// Repeating a change that is already in effect is a conflict, not a no-op,
/// so that double delivery of a link event is visible to the sender.
pub fn apply_link_change(
    record: &mut CompanyRecord,
    link_type: LinkType,
    change: LinkChange,
    context_id: &str,
) -> Result<()> {
    let links = &mut record.profile.links;
    match change {
        LinkChange::Add => {
            if links.is_present(link_type) {
                return Err(SyncError::LinkAlreadyExists {
                    company_number: record.id.clone(),
                    link_type,
                });
            }
            links.set(link_type, link_type.canonical_uri(&record.id));
        }
        LinkChange::Delete => {
            if !links.is_present(link_type) {
                return Err(SyncError::LinkAlreadyAbsent {
                    company_number: record.id.clone(),
                    link_type,
                });
            }
            links.unset(link_type);
        }
    }

    record.profile.etag = Some(etag::generate(&record.profile));
    record.stamp(context_id, link_type.delta_type());
    record.version = Some(record.next_version());
    Ok(())
}

impl CompanySyncService {
    /// Grants `link_type` on a company in response to an external link event.
    pub async fn add_link(
        &self,
        company_number: &str,
        link_type: LinkType,
        context_id: &str,
    ) -> Result<CompanyRecord> {
        ensure_externally_managed(link_type)?;
        self.change_link(company_number, link_type, LinkChange::Add, context_id)
            .await
    }

    /// Removes `link_type` from a company in response to an external link event.
    pub async fn delete_link(
        &self,
        company_number: &str,
        link_type: LinkType,
        context_id: &str,
    ) -> Result<CompanyRecord> {
        ensure_externally_managed(link_type)?;
        self.change_link(company_number, link_type, LinkChange::Delete, context_id)
            .await
    }

    pub(super) async fn change_link(
        &self,
        company_number: &str,
        link_type: LinkType,
        change: LinkChange,
        context_id: &str,
    ) -> Result<CompanyRecord> {
        let record = self
            .write_link_change(company_number, link_type, change, context_id)
            .await?;
        self.notify_changed(context_id, company_number).await?;
        Ok(record)
    }

    pub(super) async fn write_link_change(
        &self,
        company_number: &str,
        link_type: LinkType,
        change: LinkChange,
        context_id: &str,
    ) -> Result<CompanyRecord> {
        let operation = change.operation();
        let mut attempt = 1usize;
        loop {
            let mut record = self.require(company_number).await?;
            let expected_version = record.current_version();

            apply_link_change(&mut record, link_type, change, context_id).inspect_err(|err| {
                info!(company_number, link_type = %link_type, error = %err, "link change rejected");
            })?;

            let outcome = self
                .bounded(
                    "compare_and_swap",
                    company_number,
                    self.store.compare_and_swap(record.clone(), expected_version),
                )
                .await?;

            if let WriteOutcome::Written(version) = outcome {
                debug!(company_number, link_type = %link_type, operation, version, "link updated");
                return Ok(record);
            }

            if !self.should_retry(operation, company_number, attempt) {
                return Err(self.retries_exhausted(operation, company_number));
            }
            attempt += 1;
        }
    }
}

fn ensure_externally_managed(link_type: LinkType) -> Result<()> {
    if link_type.is_coordinator_managed() {
        return Err(SyncError::bad_request(format!(
            "link '{link_type}' is derived from parent/child linkage and cannot be set directly"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;

    #[test]
    fn add_then_add_again_conflicts() {
        let mut record = CompanyRecord::shell("00006400", "ctx");
        let etag_before = record.profile.etag.clone();

        apply_link_change(&mut record, LinkType::Charges, LinkChange::Add, "ctx-1").unwrap();
        assert_eq!(
            record.profile.links.get(LinkType::Charges),
            Some("/company/00006400/charges")
        );
        assert_eq!(record.version, Some(1));
        assert_ne!(record.profile.etag, etag_before);
        let updated = record.updated.as_ref().unwrap();
        assert_eq!(updated.delta_type, "charges_delta");
        assert_eq!(updated.by, "ctx-1");

        let snapshot = record.clone();
        let err = apply_link_change(&mut record, LinkType::Charges, LinkChange::Add, "ctx-2")
            .unwrap_err();
        assert!(matches!(err, SyncError::LinkAlreadyExists { .. }));
        assert_eq!(record, snapshot);
    }

    #[test]
    fn delete_of_absent_link_conflicts() {
        let mut record = CompanyRecord::shell("00006400", "ctx");
        let err = apply_link_change(&mut record, LinkType::Officers, LinkChange::Delete, "ctx")
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Conflict);
        assert!(matches!(err, SyncError::LinkAlreadyAbsent { .. }));
        assert_eq!(record.version, Some(0));
    }

    #[test]
    fn delete_removes_present_link() {
        let mut record = CompanyRecord::shell("00006400", "ctx");
        record
            .profile
            .links
            .set(LinkType::Officers, "/company/00006400/officers".to_string());

        apply_link_change(&mut record, LinkType::Officers, LinkChange::Delete, "ctx").unwrap();
        assert!(!record.profile.links.is_present(LinkType::Officers));
        assert_eq!(record.updated.unwrap().delta_type, "officer_delta");
    }

    #[test]
    fn coordinator_links_are_not_externally_managed() {
        assert!(ensure_externally_managed(LinkType::UkEstablishments).is_err());
        assert!(ensure_externally_managed(LinkType::Overseas).is_err());
        assert!(ensure_externally_managed(LinkType::Registers).is_ok());
    }
}
