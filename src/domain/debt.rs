//! Technical-debt items owned by a service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Kind of debt; the wire form is the snake_case name.
///
/// Writes accept only the known kinds. Nodes written by other tools may carry
/// any string, which reads surface as [`DebtType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DebtType {
    Code,
    Documentation,
    Testing,
    Architecture,
    Infrastructure,
    Security,
    Other(String),
}

impl DebtType {
    pub const KNOWN: [DebtType; 6] = [
        DebtType::Code,
        DebtType::Documentation,
        DebtType::Testing,
        DebtType::Architecture,
        DebtType::Infrastructure,
        DebtType::Security,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DebtType::Code => "code",
            DebtType::Documentation => "documentation",
            DebtType::Testing => "testing",
            DebtType::Architecture => "architecture",
            DebtType::Infrastructure => "infrastructure",
            DebtType::Security => "security",
            DebtType::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DebtType::Other(_))
    }
}

impl fmt::Display for DebtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse for caller input.
impl FromStr for DebtType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DebtType::KNOWN
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("invalid debt type: {s:?}")))
    }
}

/// Lenient decode for stored values.
impl From<String> for DebtType {
    fn from(raw: String) -> Self {
        let known = DebtType::KNOWN.into_iter().find(|t| t.as_str() == raw);
        known.unwrap_or(DebtType::Other(raw))
    }
}

impl From<DebtType> for String {
    fn from(t: DebtType) -> Self {
        match t {
            DebtType::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// Remediation state of a debt item.
///
/// Like [`DebtType`], an unrecognised stored status decodes to
/// [`DebtStatus::Other`] and never counts as open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DebtStatus {
    #[default]
    Pending,
    InProgress,
    Remediated,
    Other(String),
}

impl DebtStatus {
    const KNOWN: [DebtStatus; 3] = [DebtStatus::Pending, DebtStatus::InProgress, DebtStatus::Remediated];

    pub fn as_str(&self) -> &str {
        match self {
            DebtStatus::Pending => "pending",
            DebtStatus::InProgress => "in_progress",
            DebtStatus::Remediated => "remediated",
            DebtStatus::Other(raw) => raw,
        }
    }

    /// Pending and in-progress items still count against a service.
    pub fn is_open(&self) -> bool {
        matches!(self, DebtStatus::Pending | DebtStatus::InProgress)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DebtStatus::Other(_))
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebtStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DebtStatus::KNOWN
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("invalid debt status: {s:?}")))
    }
}

impl From<String> for DebtStatus {
    fn from(raw: String) -> Self {
        let known = DebtStatus::KNOWN.into_iter().find(|st| st.as_str() == raw);
        known.unwrap_or(DebtStatus::Other(raw))
    }
}

impl From<DebtStatus> for String {
    fn from(st: DebtStatus) -> Self {
        match st {
            DebtStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: String,
    #[serde(rename = "type")]
    pub debt_type: DebtType,
    pub title: String,
    pub description: String,
    pub status: DebtStatus,
    pub created: DateTime<Utc>,
}

/// Input for a new debt item.
///
/// `status` is accepted so the wire payload round-trips, but creation always
/// stores [`DebtStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDebt {
    #[serde(rename = "type")]
    pub debt_type: DebtType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<DebtStatus>,
}

impl NewDebt {
    pub fn new(debt_type: DebtType, title: impl Into<String>) -> Self {
        Self {
            debt_type,
            title: title.into(),
            description: String::new(),
            status: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: DebtStatus) -> Self {
        self.status = Some(status);
        self
    }
}
