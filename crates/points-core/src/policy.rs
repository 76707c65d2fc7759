//! Admission policies - quota and duplicate control
//!
//! Policies are evaluated against currently-stored submissions at creation
//! time. The rolling quota is always recomputed from raw rows rather than a
//! maintained counter, so there is no second mutable total to drift from the
//! submissions table.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Submission, SubmissionPayload};
use crate::error::DomainError;

/// Admission-control rule for one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// At most one active (pending or approved) submission per user.
    SingleActive,
    /// Trainee counts summed over a trailing window must stay under ceilings.
    RollingQuota(QuotaLimits),
    /// No admission constraint.
    Open,
}

/// Quota dimension names, surfaced in `QuotaExceeded` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaDimension {
    Peers,
    Students,
}

impl QuotaDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peers => "peers",
            Self::Students => "students",
        }
    }
}

impl std::fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ceilings for a rolling-window quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub window_days: i64,
    pub peer_ceiling: u32,
    pub student_ceiling: u32,
}

impl QuotaLimits {
    /// Production limits for the Amplify stage.
    pub fn amplify() -> Self {
        Self {
            window_days: 7,
            peer_ceiling: 50,
            student_ceiling: 200,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::days(self.window_days)
    }
}

/// Trainee counts carried by one Amplify submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraineeCounts {
    pub peers: u32,
    pub students: u32,
}

impl TraineeCounts {
    pub fn from_payload(payload: &SubmissionPayload) -> Self {
        match payload {
            SubmissionPayload::Amplify {
                peers_trained,
                students_trained,
                ..
            } => Self {
                peers: *peers_trained,
                students: *students_trained,
            },
            _ => Self::default(),
        }
    }
}

/// Checks a new submission's trainee counts against the rolling window.
///
/// A prior submission counts when `created_at > now - window`: the window is
/// inclusive of the instant of evaluation and exclusive at the trailing
/// boundary, so a submission exactly window-old (or older) no longer counts.
/// Both ceilings are checked independently; the first violated dimension is
/// reported.
pub fn check_rolling_quota(
    limits: &QuotaLimits,
    prior: &[Submission],
    incoming: TraineeCounts,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let cutoff = now - limits.window();
    let mut peers = i64::from(incoming.peers);
    let mut students = i64::from(incoming.students);
    for submission in prior.iter().filter(|s| s.created_at > cutoff) {
        let counts = TraineeCounts::from_payload(&submission.payload);
        peers += i64::from(counts.peers);
        students += i64::from(counts.students);
    }

    if peers > i64::from(limits.peer_ceiling) {
        return Err(DomainError::QuotaExceeded {
            dimension: QuotaDimension::Peers,
            attempted: peers,
            ceiling: i64::from(limits.peer_ceiling),
        });
    }
    if students > i64::from(limits.student_ceiling) {
        return Err(DomainError::QuotaExceeded {
            dimension: QuotaDimension::Students,
            attempted: students,
            ceiling: i64::from(limits.student_ceiling),
        });
    }
    Ok(())
}
