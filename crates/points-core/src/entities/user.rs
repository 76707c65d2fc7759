//! User entity - a program participant or reviewer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::RecordId;

/// Account role within the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Participant,
    Reviewer,
    Admin,
    Superadmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Reviewer => "reviewer",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    pub fn can_review(&self) -> bool {
        matches!(self, Self::Reviewer | Self::Admin | Self::Superadmin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant" => Ok(Self::Participant),
            "reviewer" => Ok(Self::Reviewer),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::Superadmin),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// A participant or reviewer account.
///
/// Accounts are created on first sign-in and never hard-deleted; the audit
/// trail references them forever. `ineligible` marks student-type accounts
/// that may browse but cannot submit evidence or earn credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: RecordId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub ineligible: bool,
    /// LMS contact id, filled lazily the first time a webhook event matches
    /// this account by email.
    pub lms_contact_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: RecordId, email: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            display_name,
            role: UserRole::Participant,
            ineligible: false,
            lms_contact_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this account may create submissions and earn credit.
    #[inline]
    pub fn can_earn_credit(&self) -> bool {
        !self.ineligible
    }
}
