use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::CompanyProfile;
use crate::delta::DeltaAt;

/// Last-mutation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    pub at: DateTime<Utc>,
    pub by: String,
    #[serde(rename = "type")]
    pub delta_type: String,
}

impl Updated {
    pub fn now(context_id: &str, delta_type: &str) -> Self {
        Self {
            at: Utc::now(),
            by: context_id.to_string(),
            delta_type: delta_type.to_string(),
        }
    }
}

/// Stored unit, one per company number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    pub profile: CompanyProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_at: Option<DeltaAt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_company_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_mortgages: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Updated>,
    /// `None` only on legacy records written before versioning existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl CompanyRecord {
    /// Record holding only the identifier, used when a subordinate arrives
    /// before its parent.
    pub fn shell(company_number: &str, context_id: &str) -> Self {
        Self {
            id: company_number.to_string(),
            profile: CompanyProfile::shell(company_number),
            delta_at: None,
            parent_company_number: None,
            has_mortgages: None,
            updated: Some(Updated::now(context_id, "company_delta")),
            version: Some(0),
        }
    }

    /// Version used for compare-and-swap. Legacy records count as 0.
    pub fn current_version(&self) -> u64 {
        self.version.unwrap_or(0)
    }

    /// Version the next successful write will carry.
    ///
    /// A legacy record is upgraded to 0 rather than incremented.
    pub fn next_version(&self) -> u64 {
        self.version.map_or(0, |version| version + 1)
    }

    pub fn is_legacy(&self) -> bool {
        self.version.is_none()
    }

    pub fn stamp(&mut self, context_id: &str, delta_type: &str) {
        self.updated = Some(Updated::now(context_id, delta_type));
    }
}
