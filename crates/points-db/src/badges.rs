//! Badge evaluation hook
//!
//! External-collaborator contract: idempotent, safe to call after every
//! point credit, no-ops for badges already earned. The trait takes the
//! open credit transaction so a badge can never be granted for points that
//! end up rolled back.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

/// Badge codes and the overall point totals that earn them.
///
/// Criteria authoring is out of scope; this table is the closed production
/// set.
pub const BADGE_THRESHOLDS: &[(&str, i64)] = &[
    ("rising_star", 50),
    ("amplifier", 150),
    ("luminary", 300),
];

/// Invoked inside the credit transaction after a ledger insert.
#[async_trait]
pub trait BadgeEvaluator: Send + Sync {
    async fn grant_badges(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<(), sqlx::Error>;
}

/// Threshold-table evaluator backed by the user_badges table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdBadgeEvaluator;

#[async_trait]
impl BadgeEvaluator for ThresholdBadgeEvaluator {
    async fn grant_badges(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<(), sqlx::Error> {
        // Total includes the entry inserted earlier in this transaction.
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM points_ledger WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        for (badge_code, threshold) in BADGE_THRESHOLDS {
            if total >= *threshold {
                sqlx::query(
                    r#"
                    INSERT INTO user_badges (user_id, badge_code, earned_at)
                    VALUES ($1, $2, NOW())
                    ON CONFLICT (user_id, badge_code) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(badge_code)
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }
}

/// Evaluator that grants nothing; for deployments that run badge awards
/// elsewhere, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBadgeEvaluator;

#[async_trait]
impl BadgeEvaluator for NoopBadgeEvaluator {
    async fn grant_badges(
        &self,
        _tx: &mut Transaction<'_, Postgres>,
        _user_id: i64,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
