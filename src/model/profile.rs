use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::links::Links;
use crate::delta::DeltaAt;
use crate::error::{Result, SyncError};

/// Company profile payload.
///
/// Only the fields the sync engine reasons about are typed; everything else
/// travels through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_status: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub company_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_office_address: Option<RegisteredOfficeAddress>,
    #[serde(default)]
    pub links: Links,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl CompanyProfile {
    /// Minimal profile carrying nothing but the identifier.
    pub fn shell(company_number: &str) -> Self {
        Self {
            company_number: Some(company_number.to_string()),
            ..Self::default()
        }
    }

    pub fn locality(&self) -> Option<&str> {
        self.registered_office_address
            .as_ref()
            .and_then(|address| address.locality.as_deref())
    }

    /// Shape served to public readers: `care_of_name` content is exposed
    /// under `care_of`.
    pub fn into_public(mut self) -> Self {
        if let Some(address) = self.registered_office_address.as_mut() {
            address.expose_care_of_name();
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredOfficeAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_of_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl RegisteredOfficeAddress {
    /// Moves a lone `care_of` into `care_of_name` before storage.
    pub fn normalise_care_of(&mut self) {
        if !has_text(&self.care_of) || has_text(&self.care_of_name) {
            return;
        }
        self.care_of_name = self.care_of.take();
    }

    fn expose_care_of_name(&mut self) {
        if let Some(name) = self.care_of_name.take() {
            self.care_of = Some(name);
        }
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

/// Full-profile delta submitted by upstream producers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDelta {
    /// Required: a delta without a profile would replace the stored one with
    /// an empty document.
    pub data: CompanyProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_company_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_mortgages: Option<bool>,
}

impl ProfileDelta {
    /// Parses and requires the delta timestamp.
    pub fn delta_at(&self) -> Result<DeltaAt> {
        match self.delta_at.as_deref() {
            Some(raw) if !raw.trim().is_empty() => DeltaAt::parse(raw),
            _ => Err(SyncError::bad_request("delta_at is required")),
        }
    }

    /// Parent reference with blank values treated as absent.
    pub fn parent(&self) -> Option<&str> {
        self.parent_company_number
            .as_deref()
            .map(str::trim)
            .filter(|parent| !parent.is_empty())
    }

    /// Checks the payload against the company addressed by the request.
    pub fn validate_for(&self, company_number: &str) -> Result<DeltaAt> {
        let delta_at = self.delta_at()?;

        if let Some(payload_number) = self.data.company_number.as_deref() {
            if payload_number != company_number {
                return Err(SyncError::bad_request(format!(
                    "payload company_number '{payload_number}' does not match '{company_number}'"
                )));
            }
        }

        if self.parent() == Some(company_number) {
            return Err(SyncError::bad_request(format!(
                "company {company_number} cannot be its own parent"
            )));
        }

        Ok(delta_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "company_number": "00006400",
            "company_name": "ACME LIMITED",
            "type": "ltd",
            "date_of_creation": "1990-01-01",
            "accounts": { "overdue": false },
            "registered_office_address": {
                "address_line_1": "1 High Street",
                "locality": "Cardiff"
            },
            "links": { "officers": "/company/00006400/officers" }
        });

        let profile: CompanyProfile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(profile.company_type.as_deref(), Some("ltd"));
        assert_eq!(profile.locality(), Some("Cardiff"));
        assert_eq!(profile.extra["date_of_creation"], "1990-01-01");

        assert_eq!(serde_json::to_value(&profile).unwrap(), raw);
    }

    #[test]
    fn lone_care_of_moves_to_care_of_name() {
        let mut address = RegisteredOfficeAddress {
            care_of: Some("J SMITH".to_string()),
            ..RegisteredOfficeAddress::default()
        };
        address.normalise_care_of();
        assert_eq!(address.care_of, None);
        assert_eq!(address.care_of_name.as_deref(), Some("J SMITH"));
    }

    #[test]
    fn care_of_with_name_is_left_alone() {
        let mut address = RegisteredOfficeAddress {
            care_of: Some("J SMITH".to_string()),
            care_of_name: Some("JANE SMITH".to_string()),
            ..RegisteredOfficeAddress::default()
        };
        address.normalise_care_of();
        assert_eq!(address.care_of.as_deref(), Some("J SMITH"));
        assert_eq!(address.care_of_name.as_deref(), Some("JANE SMITH"));
    }

    #[test]
    fn public_view_serves_care_of_name_as_care_of() {
        let profile = CompanyProfile {
            registered_office_address: Some(RegisteredOfficeAddress {
                care_of_name: Some("J SMITH".to_string()),
                ..RegisteredOfficeAddress::default()
            }),
            ..CompanyProfile::default()
        };

        let value = serde_json::to_value(profile.into_public()).unwrap();
        assert_eq!(
            value["registered_office_address"],
            json!({ "care_of": "J SMITH" })
        );
    }

    #[test]
    fn delta_requires_timestamp() {
        let delta = ProfileDelta::default();
        assert_eq!(delta.delta_at().unwrap_err().kind(), SyncErrorKind::BadRequest);

        let delta = ProfileDelta {
            delta_at: Some("   ".to_string()),
            ..ProfileDelta::default()
        };
        assert_eq!(delta.delta_at().unwrap_err().kind(), SyncErrorKind::BadRequest);
    }

    #[test]
    fn delta_without_data_is_rejected() {
        let err = serde_json::from_value::<ProfileDelta>(json!({
            "delta_at": "20240101000000000000"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("data"));
    }

    #[test]
    fn delta_company_number_must_match_path() {
        let delta = ProfileDelta {
            data: CompanyProfile::shell("00006401"),
            delta_at: Some("20240101000000000000".to_string()),
            ..ProfileDelta::default()
        };
        assert!(delta.validate_for("00006401").is_ok());
        assert_eq!(
            delta.validate_for("00006400").unwrap_err().kind(),
            SyncErrorKind::BadRequest
        );
    }

    #[test]
    fn blank_parent_is_no_parent() {
        let delta = ProfileDelta {
            parent_company_number: Some(" ".to_string()),
            ..ProfileDelta::default()
        };
        assert_eq!(delta.parent(), None);
    }
}
