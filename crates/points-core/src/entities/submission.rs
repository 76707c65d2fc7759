//! Submission entity - one piece of evidence for one activity
//!
//! Lifecycle: `pending` (initial) -> `approved` | `rejected`, both terminal.
//! Terminal rows are never mutated again; the only writer past creation is
//! the review orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityCode;
use crate::error::DomainError;
use crate::value_objects::RecordId;

/// Submission review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Approved and rejected are terminal; no transition leaves them.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Active statuses block a new single-completion submission: a pending
    /// or approved row means the stage is taken, only rejection frees it.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown submission status: {other}")),
        }
    }
}

/// Who can see a submission on the public showcase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

/// Activity-specific evidence, one variant per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SubmissionPayload {
    Learn {
        course_name: String,
        reflection: Option<String>,
    },
    Explore {
        tool_name: String,
        description: String,
        evidence_path: Option<String>,
    },
    Amplify {
        peers_trained: u32,
        students_trained: u32,
        session_format: Option<String>,
        evidence_path: Option<String>,
    },
    Present {
        event_name: String,
        audience: Option<u32>,
        evidence_path: Option<String>,
    },
    Shine {
        summary: String,
        artifact_path: Option<String>,
    },
}

impl SubmissionPayload {
    /// The activity this payload variant belongs to.
    pub fn activity(&self) -> ActivityCode {
        match self {
            Self::Learn { .. } => ActivityCode::Learn,
            Self::Explore { .. } => ActivityCode::Explore,
            Self::Amplify { .. } => ActivityCode::Amplify,
            Self::Present { .. } => ActivityCode::Present,
            Self::Shine { .. } => ActivityCode::Shine,
        }
    }

    /// Structural checks the schema cannot express.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Learn { course_name, .. } => {
                require_nonempty(course_name, "course_name")?;
            }
            Self::Explore {
                tool_name,
                description,
                ..
            } => {
                require_nonempty(tool_name, "tool_name")?;
                require_nonempty(description, "description")?;
            }
            Self::Amplify {
                peers_trained,
                students_trained,
                ..
            } => {
                if *peers_trained == 0 && *students_trained == 0 {
                    return Err(DomainError::InvalidPayload(
                        "an amplify session must train at least one peer or student".to_string(),
                    ));
                }
            }
            Self::Present { event_name, .. } => {
                require_nonempty(event_name, "event_name")?;
            }
            Self::Shine { summary, .. } => {
                require_nonempty(summary, "summary")?;
            }
        }
        Ok(())
    }
}

fn require_nonempty(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidPayload(format!("{field} must not be empty")));
    }
    Ok(())
}

/// One piece of evidence submitted for one activity by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: RecordId,
    pub user_id: RecordId,
    pub activity: ActivityCode,
    pub status: SubmissionStatus,
    pub visibility: Visibility,
    pub payload: SubmissionPayload,
    pub reviewer_id: Option<RecordId>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        id: RecordId,
        user_id: RecordId,
        payload: SubmissionPayload,
        visibility: Visibility,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            activity: payload.activity(),
            status: SubmissionStatus::Pending,
            visibility,
            payload,
            reviewer_id: None,
            review_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to approved. Fails outside `pending`.
    pub fn approve(
        &mut self,
        reviewer_id: RecordId,
        note: Option<String>,
    ) -> Result<(), DomainError> {
        self.transition(SubmissionStatus::Approved, reviewer_id, note)
    }

    /// Transition to rejected. Fails outside `pending`.
    pub fn reject(
        &mut self,
        reviewer_id: RecordId,
        note: Option<String>,
    ) -> Result<(), DomainError> {
        self.transition(SubmissionStatus::Rejected, reviewer_id, note)
    }

    fn transition(
        &mut self,
        to: SubmissionStatus,
        reviewer_id: RecordId,
        note: Option<String>,
    ) -> Result<(), DomainError> {
        if !self.status.is_pending() {
            return Err(DomainError::InvalidState {
                current: self.status,
            });
        }
        self.status = to;
        self.reviewer_id = Some(reviewer_id);
        self.review_note = note;
        self.updated_at = Utc::now();
        Ok(())
    }
}
