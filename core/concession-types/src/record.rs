//! The concession record and the form data used to create or edit one.

use crate::RecordId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of permit a concession is held under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitType {
    #[default]
    Exploration,
    Mining,
    Quarrying,
    Prospecting,
    /// Anything the remote layer reports that this build does not know.
    #[serde(other)]
    Other,
}

impl PermitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploration => "exploration",
            Self::Mining => "mining",
            Self::Quarrying => "quarrying",
            Self::Prospecting => "prospecting",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PermitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermitType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; unknown values map to [`PermitType::Other`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "exploration" => Self::Exploration,
            "mining" => Self::Mining,
            "quarrying" => Self::Quarrying,
            "prospecting" => Self::Prospecting,
            _ => Self::Other,
        })
    }
}

/// Administrative status of a concession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Pending,
    Active,
    Suspended,
    Expired,
    Revoked,
    #[serde(other)]
    Unknown,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            "expired" => Self::Expired,
            "revoked" => Self::Revoked,
            _ => Self::Unknown,
        })
    }
}

/// Optional contact details for the concession holder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ContactInfo {
    /// Returns true when no contact field is set.
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none() && self.address.is_none()
    }
}

/// A managed concession with a polygonal boundary.
///
/// `boundary` is an ordered list of `[longitude, latitude]` pairs. It may be
/// empty, open or closed; the store passes it through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub owner: String,
    /// Area in hectares as entered by the user.
    pub size: f64,
    #[serde(default)]
    pub permit_type: PermitType,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub boundary: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
}

impl Record {
    /// Returns the editable fields of this record as form data.
    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            name: self.name.clone(),
            owner: self.owner.clone(),
            size: self.size,
            permit_type: self.permit_type,
            status: self.status,
            region: self.region.clone(),
            district: self.district.clone(),
            expiry_date: self.expiry_date,
            boundary: self.boundary.clone(),
            contact_info: self.contact_info.clone(),
        }
    }

    /// Returns a copy of this record carrying a different id.
    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }
}

/// Form data submitted to create or update a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub name: String,
    pub owner: String,
    pub size: f64,
    #[serde(default)]
    pub permit_type: PermitType,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub boundary: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
}

impl RecordDraft {
    /// Creates a draft with the required fields set and everything else
    /// defaulted.
    pub fn new(name: impl Into<String>, owner: impl Into<String>, size: f64) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            size,
            ..Default::default()
        }
    }

    /// Checks the required fields: `name` and `owner` must be non-blank and
    /// `size` must be a finite positive number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if self.owner.trim().is_empty() {
            return Err(ValidationError::new("owner", "must not be empty"));
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(ValidationError::new(
                "size",
                format!("must be a positive number, got {}", self.size),
            ));
        }
        Ok(())
    }

    /// Builds the record this draft describes under the given id.
    ///
    /// Does not validate; callers run [`RecordDraft::validate`] first.
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            name: self.name,
            owner: self.owner,
            size: self.size,
            permit_type: self.permit_type,
            status: self.status,
            region: self.region,
            district: self.district,
            expiry_date: self.expiry_date,
            boundary: self.boundary,
            contact_info: self.contact_info.filter(|c| !c.is_empty()),
        }
    }
}

/// A required field was missing or invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// The offending form field.
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
