//! Outbound "resource changed" notifications.
//!
//! Called after a store mutation has committed. A failure is reported back to
//! the caller as [`SyncError::Notification`] but never undoes the mutation.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::model::{CompanyProfile, company_uri};

pub use http::HttpChangeNotifier;

pub const RESOURCE_KIND: &str = "company-profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEventType {
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub event_type: ChangeEventType,
    pub published_at: String,
}

/// Body of the resource-changed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChanged {
    pub resource_uri: String,
    pub resource_kind: String,
    pub resource_id: String,
    pub context_id: String,
    pub event: ChangeEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_data: Option<CompanyProfile>,
}

impl ResourceChanged {
    pub fn changed(context_id: &str, company_number: &str) -> Self {
        Self::build(context_id, company_number, ChangeEventType::Changed, None, Utc::now())
    }

    pub fn deleted(context_id: &str, company_number: &str, last_known: &CompanyProfile) -> Self {
        Self::build(
            context_id,
            company_number,
            ChangeEventType::Deleted,
            Some(last_known.clone().into_public()),
            Utc::now(),
        )
    }

    fn build(
        context_id: &str,
        company_number: &str,
        event_type: ChangeEventType,
        deleted_data: Option<CompanyProfile>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_uri: company_uri(company_number),
            resource_kind: RESOURCE_KIND.to_string(),
            resource_id: company_number.to_string(),
            context_id: context_id.to_string(),
            event: ChangeEvent {
                event_type,
                published_at: published_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            deleted_data,
        }
    }
}

#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify_changed(&self, context_id: &str, company_number: &str) -> Result<()>;

    async fn notify_deleted(
        &self,
        context_id: &str,
        company_number: &str,
        last_known: &CompanyProfile,
    ) -> Result<()>;
}

/// Notifier used when no downstream endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl ChangeNotifier for NoopNotifier {
    async fn notify_changed(&self, _context_id: &str, _company_number: &str) -> Result<()> {
        Ok(())
    }

    async fn notify_deleted(
        &self,
        _context_id: &str,
        _company_number: &str,
        _last_known: &CompanyProfile,
    ) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn notification_error(company_number: &str, cause: impl std::fmt::Display) -> SyncError {
    SyncError::Notification(format!("company {company_number}: {cause}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegisteredOfficeAddress;

    #[test]
    fn changed_event_shape() {
        let event = ResourceChanged::changed("ctx-1", "00006400");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["resource_uri"], "/company/00006400");
        assert_eq!(value["resource_kind"], "company-profile");
        assert_eq!(value["event"]["type"], "changed");
        assert!(value.get("deleted_data").is_none());
    }

    #[test]
    fn deleted_event_carries_public_profile() {
        let profile = CompanyProfile {
            registered_office_address: Some(RegisteredOfficeAddress {
                care_of_name: Some("J SMITH".to_string()),
                ..RegisteredOfficeAddress::default()
            }),
            ..CompanyProfile::shell("00006400")
        };
        let event = ResourceChanged::deleted("ctx-2", "00006400", &profile);

        assert_eq!(event.event.event_type, ChangeEventType::Deleted);
        let data = event.deleted_data.unwrap();
        let address = data.registered_office_address.unwrap();
        assert_eq!(address.care_of.as_deref(), Some("J SMITH"));
        assert_eq!(address.care_of_name, None);
    }
}
