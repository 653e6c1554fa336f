use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{Result, SyncError};

/// Named sub-resource links a company profile can carry.
///
/// Every variant maps to exactly one field of [`Links`] through
/// [`Links::get`] and [`Links::set`]; there is no other way to reach a
/// link slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkType {
    Charges,
    Exemptions,
    FilingHistory,
    Insolvency,
    Officers,
    PersonsWithSignificantControl,
    PersonsWithSignificantControlStatements,
    Registers,
    UkEstablishments,
    Overseas,
}

impl LinkType {
    pub const ALL: [LinkType; 10] = [
        LinkType::Charges,
        LinkType::Exemptions,
        LinkType::FilingHistory,
        LinkType::Insolvency,
        LinkType::Officers,
        LinkType::PersonsWithSignificantControl,
        LinkType::PersonsWithSignificantControlStatements,
        LinkType::Registers,
        LinkType::UkEstablishments,
        LinkType::Overseas,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Charges => "charges",
            Self::Exemptions => "exemptions",
            Self::FilingHistory => "filing-history",
            Self::Insolvency => "insolvency",
            Self::Officers => "officers",
            Self::PersonsWithSignificantControl => "persons-with-significant-control",
            Self::PersonsWithSignificantControlStatements => {
                "persons-with-significant-control-statements"
            }
            Self::Registers => "registers",
            Self::UkEstablishments => "uk-establishments",
            Self::Overseas => "overseas",
        }
    }

    /// Delta-type tag written into `updated.type` when this link is mutated.
    pub const fn delta_type(&self) -> &'static str {
        match self {
            Self::Charges => "charges_delta",
            Self::Exemptions => "exemption_delta",
            Self::FilingHistory => "filing_history_delta",
            Self::Insolvency => "insolvency_delta",
            Self::Officers => "officer_delta",
            Self::PersonsWithSignificantControl => "psc_delta",
            Self::PersonsWithSignificantControlStatements => "psc_statement_delta",
            Self::Registers => "registers_delta",
            Self::UkEstablishments | Self::Overseas => "company_delta",
        }
    }

    /// Links whose state is derived from parent/child linkage and never from
    /// a single external link event.
    pub const fn is_coordinator_managed(&self) -> bool {
        matches!(self, Self::UkEstablishments | Self::Overseas)
    }

    /// Canonical URI for the link on `company_number`.
    ///
    /// For [`LinkType::Overseas`] the argument is the parent company, since
    /// the link points at the parent profile itself.
    pub fn canonical_uri(&self, company_number: &str) -> String {
        match self {
            Self::Overseas => company_uri(company_number),
            other => format!("/company/{company_number}/{}", other.as_str()),
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        LinkType::ALL
            .into_iter()
            .find(|link| link.as_str() == s)
            .ok_or_else(|| SyncError::bad_request(format!("unknown link type '{s}'")))
    }
}

pub fn company_uri(company_number: &str) -> String {
    format!("/company/{company_number}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charges: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemptions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insolvency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub officers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persons_with_significant_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persons_with_significant_control_statements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uk_establishments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overseas: Option<String>,
    /// Links outside the known table, kept verbatim.
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl Links {
    pub fn get(&self, link_type: LinkType) -> Option<&str> {
        let slot = match link_type {
            LinkType::Charges => &self.charges,
            LinkType::Exemptions => &self.exemptions,
            LinkType::FilingHistory => &self.filing_history,
            LinkType::Insolvency => &self.insolvency,
            LinkType::Officers => &self.officers,
            LinkType::PersonsWithSignificantControl => &self.persons_with_significant_control,
            LinkType::PersonsWithSignificantControlStatements => {
                &self.persons_with_significant_control_statements
            }
            LinkType::Registers => &self.registers,
            LinkType::UkEstablishments => &self.uk_establishments,
            LinkType::Overseas => &self.overseas,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, link_type: LinkType) -> &mut Option<String> {
        match link_type {
            LinkType::Charges => &mut self.charges,
            LinkType::Exemptions => &mut self.exemptions,
            LinkType::FilingHistory => &mut self.filing_history,
            LinkType::Insolvency => &mut self.insolvency,
            LinkType::Officers => &mut self.officers,
            LinkType::PersonsWithSignificantControl => &mut self.persons_with_significant_control,
            LinkType::PersonsWithSignificantControlStatements => {
                &mut self.persons_with_significant_control_statements
            }
            LinkType::Registers => &mut self.registers,
            LinkType::UkEstablishments => &mut self.uk_establishments,
            LinkType::Overseas => &mut self.overseas,
        }
    }

    /// A link is present only when its slot holds a non-blank URI.
    pub fn is_present(&self, link_type: LinkType) -> bool {
        self.get(link_type).is_some_and(|uri| !uri.trim().is_empty())
    }

    pub fn set(&mut self, link_type: LinkType, uri: String) {
        *self.slot_mut(link_type) = Some(uri);
    }

    pub fn unset(&mut self, link_type: LinkType) -> Option<String> {
        self.slot_mut(link_type).take()
    }

    /// Fills every link absent here with the value held by `previous`.
    ///
    /// Links present here always win, unknown keys included. The self link
    /// is not carried; it is recomputed by the merge.
    pub fn carry_over_from(&mut self, previous: &Links) {
        for link_type in LinkType::ALL {
            if self.is_present(link_type) || !previous.is_present(link_type) {
                continue;
            }
            if let Some(uri) = previous.get(link_type) {
                self.set(link_type, uri.to_string());
            }
        }
        for (key, uri) in &previous.extra {
            if !self.extra.contains_key(key) {
                self.extra.insert(key.clone(), uri.clone());
            }
        }
    }

    pub fn present(&self) -> impl Iterator<Item = LinkType> + '_ {
        LinkType::ALL
            .into_iter()
            .filter(|link_type| self.is_present(*link_type))
    }
}
