//! Course grant database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for course_grants table
#[derive(Debug, Clone, FromRow)]
pub struct CourseGrantModel {
    pub user_id: i64,
    pub signal: String,
    pub granted_at: DateTime<Utc>,
}
