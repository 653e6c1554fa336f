//! Parent/child establishment coordination.
//!
//! A parent carries the "uk-establishments" link exactly when at least one
//! record names it as `parent_company_number`. Existence is recomputed by
//! query at each mutation instead of being tracked as a counter, so a crash
//! between the child write and the parent write is repaired by the next
//! delta touching either side.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::CompanySyncService;
use super::links::LinkChange;
use crate::error::{Result, SyncError};
use crate::model::{CompanyRecord, LinkType, company_uri};

/// Listing of a parent's UK establishments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UkEstablishments {
    pub kind: String,
    pub links: UkEstablishmentLinks,
    pub items: Vec<UkEstablishment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UkEstablishmentLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UkEstablishment {
    pub company_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    pub links: UkEstablishmentCompanyLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UkEstablishmentCompanyLink {
    pub company: String,
}

impl From<&CompanyRecord> for UkEstablishment {
    fn from(record: &CompanyRecord) -> Self {
        Self {
            company_number: record.id.clone(),
            company_name: record.profile.company_name.clone(),
            company_status: record.profile.company_status.clone(),
            locality: record.profile.locality().map(str::to_string),
            links: UkEstablishmentCompanyLink {
                company: company_uri(&record.id),
            },
        }
    }
}

impl CompanySyncService {
    /// Lists the records naming `parent_company_number` as their parent.
    pub async fn get_uk_establishments(
        &self,
        parent_company_number: &str,
    ) -> Result<UkEstablishments> {
        let children = self.find_children(parent_company_number).await?;
        if children.is_empty() && self.load(parent_company_number).await?.is_none() {
            return Err(SyncError::not_found(parent_company_number));
        }

        Ok(UkEstablishments {
            kind: "related-companies".to_string(),
            links: UkEstablishmentLinks {
                self_link: LinkType::UkEstablishments.canonical_uri(parent_company_number),
            },
            items: children.iter().map(UkEstablishment::from).collect(),
        })
    }

    /// Makes sure `parent_company_number` exists and carries the aggregate
    /// link. Returns `true` when the link was added by this call; a parent
    /// that already has it is left untouched. The parent's changed
    /// notification is left to the caller.
    pub(super) async fn attach_to_parent(
        &self,
        parent_company_number: &str,
        context_id: &str,
    ) -> Result<bool> {
        self.bounded(
            "ensure_exists",
            parent_company_number,
            self.store
                .ensure_exists(CompanyRecord::shell(parent_company_number, context_id)),
        )
        .await?;

        match self
            .write_link_change(
                parent_company_number,
                LinkType::UkEstablishments,
                LinkChange::Add,
                context_id,
            )
            .await
        {
            Ok(_) => {
                debug!(parent_company_number, "uk-establishments link added to parent");
                Ok(true)
            }
            Err(SyncError::LinkAlreadyExists { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Drops the aggregate link from `parent_company_number` once no record
    /// points at it any more. Absent parents need no cleanup. Returns `true`
    /// when the link was removed by this call.
    pub(super) async fn detach_from_parent(
        &self,
        parent_company_number: &str,
        context_id: &str,
    ) -> Result<bool> {
        let remaining = self.find_children(parent_company_number).await?;
        if !remaining.is_empty() {
            debug!(
                parent_company_number,
                remaining = remaining.len(),
                "parent still has uk establishments"
            );
            return Ok(false);
        }

        match self
            .write_link_change(
                parent_company_number,
                LinkType::UkEstablishments,
                LinkChange::Delete,
                context_id,
            )
            .await
        {
            Ok(_) => {
                debug!(parent_company_number, "uk-establishments link removed from parent");
                Ok(true)
            }
            Err(SyncError::NotFound(_) | SyncError::LinkAlreadyAbsent { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Detaches from `parent_company_number` and announces the parent change.
    /// Failures are logged here and handed back so the caller can finish its
    /// own side effects first.
    pub(super) async fn release_parent(
        &self,
        company_number: &str,
        parent_company_number: &str,
        context_id: &str,
    ) -> Result<()> {
        match self.detach_from_parent(parent_company_number, context_id).await {
            Ok(true) => self.notify_changed(context_id, parent_company_number).await,
            Ok(false) => Ok(()),
            Err(err) => {
                error!(
                    company_number,
                    parent_company_number,
                    error = %err,
                    "parent cleanup failed"
                );
                Err(err)
            }
        }
    }

    async fn find_children(&self, parent_company_number: &str) -> Result<Vec<CompanyRecord>> {
        self.bounded(
            "find_by_parent",
            parent_company_number,
            self.store.find_by_parent(parent_company_number),
        )
        .await
    }
}
