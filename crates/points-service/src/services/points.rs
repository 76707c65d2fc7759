//! Points service - derived totals
//!
//! Totals are always computed by summing ledger deltas. The leaderboard's
//! read-optimized cache is refreshed by an external batch job; this service
//! is the authoritative read path it feeds from.

use tracing::instrument;

use points_core::value_objects::RecordId;
use points_core::{ActivityCode, DomainError};

use crate::dto::{ActivityPointsResponse, PointsSummaryResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Points service
pub struct PointsService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PointsService<'a> {
    /// Create a new PointsService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Current totals for a user, overall and per activity
    #[instrument(skip(self))]
    pub async fn summary_for_user(&self, user_id: RecordId) -> ServiceResult<PointsSummaryResponse> {
        if self.ctx.users().find_by_id(user_id).await?.is_none() {
            return Err(DomainError::UserNotFound(user_id).into());
        }

        let total = self.ctx.ledger().total_for_user(user_id).await?;

        let mut by_activity = Vec::with_capacity(ActivityCode::ALL.len());
        for activity in ActivityCode::ALL {
            let points = self
                .ctx
                .ledger()
                .total_for_user_activity(user_id, activity)
                .await?;
            if points != 0 {
                by_activity.push(ActivityPointsResponse {
                    activity: activity.as_str().to_string(),
                    points,
                });
            }
        }

        Ok(PointsSummaryResponse {
            user_id: user_id.to_string(),
            total,
            by_activity,
        })
    }
}
