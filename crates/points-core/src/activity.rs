//! Activity reference data - the five program stages
//!
//! The stages are a closed set, so they live in one enum and every
//! per-activity behavior (display name, default points, admission policy,
//! credit routing) is an exhaustive match. Adding a stage is a compile
//! error everywhere it matters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::SubmissionPayload;
use crate::policy::{AdmissionPolicy, QuotaLimits};

/// Course-completion signals the ingest pipeline recognizes.
///
/// Signals are normalized (lower-cased, trimmed) before this list is
/// consulted. Anything else is stored as not-actionable.
pub const COURSE_COMPLETION_SIGNALS: &[&str] = &[
    "learn_course_complete",
    "foundations_complete",
    "classroom_tech_complete",
];

/// Returns true when a normalized signal names a creditable course completion.
pub fn is_recognized_course_signal(signal: &str) -> bool {
    COURSE_COMPLETION_SIGNALS.contains(&signal)
}

/// The five program stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCode {
    Learn,
    Explore,
    Amplify,
    Present,
    Shine,
}

impl ActivityCode {
    pub const ALL: [ActivityCode; 5] = [
        Self::Learn,
        Self::Explore,
        Self::Amplify,
        Self::Present,
        Self::Shine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learn => "learn",
            Self::Explore => "explore",
            Self::Amplify => "amplify",
            Self::Present => "present",
            Self::Shine => "shine",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Learn => "Learn",
            Self::Explore => "Explore",
            Self::Amplify => "Amplify",
            Self::Present => "Present",
            Self::Shine => "Shine",
        }
    }

    /// Points credited when no payload-specific scoring applies.
    pub fn default_points(&self) -> i64 {
        match self {
            Self::Learn => 50,
            Self::Explore => 15,
            Self::Amplify => 20,
            Self::Present => 30,
            Self::Shine => 40,
        }
    }

    /// Whether reviewer approval of a submission for this activity produces
    /// a ledger credit. Learn credit flows only through the course-completion
    /// webhook; manual approval acknowledges the evidence without paying
    /// points a second time.
    pub fn credits_via_manual_review(&self) -> bool {
        match self {
            Self::Learn => false,
            Self::Explore | Self::Amplify | Self::Present | Self::Shine => true,
        }
    }

    /// Admission-control rule checked before a submission may be created.
    pub fn admission_policy(&self) -> AdmissionPolicy {
        match self {
            Self::Learn => AdmissionPolicy::SingleActive,
            Self::Amplify => AdmissionPolicy::RollingQuota(QuotaLimits::amplify()),
            Self::Explore | Self::Present | Self::Shine => AdmissionPolicy::Open,
        }
    }
}

impl fmt::Display for ActivityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for activity codes outside the fixed reference set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity code: {0}")]
pub struct UnknownActivityError(pub String);

impl std::str::FromStr for ActivityCode {
    type Err = UnknownActivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learn" => Ok(Self::Learn),
            "explore" => Ok(Self::Explore),
            "amplify" => Ok(Self::Amplify),
            "present" => Ok(Self::Present),
            "shine" => Ok(Self::Shine),
            other => Err(UnknownActivityError(other.to_string())),
        }
    }
}

/// Activity scoring contract.
///
/// Pure and deterministic over (activity, payload); implementations must
/// never return a negative value. Consumed by the review orchestrator; the
/// engine treats it as an external collaborator so tests can substitute
/// fixed scores.
pub trait Scoring: Send + Sync {
    fn compute_points(&self, activity: ActivityCode, payload: &SubmissionPayload) -> i64;
}

/// Production scoring table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScoring;

impl Scoring for DefaultScoring {
    fn compute_points(&self, activity: ActivityCode, payload: &SubmissionPayload) -> i64 {
        match (activity, payload) {
            (
                ActivityCode::Amplify,
                SubmissionPayload::Amplify {
                    peers_trained,
                    students_trained,
                    ..
                },
            ) => 2 * i64::from(*peers_trained) + i64::from(*students_trained),
            (activity, _) => activity.default_points(),
        }
    }
}
