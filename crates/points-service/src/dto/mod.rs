//! Data transfer objects

mod mappers;
mod requests;
mod responses;

pub use mappers::parse_payload;
pub use requests::{
    BulkReviewRequest, CreateSubmissionRequest, ReviewDecision, ReviewRequest, WebhookPayload,
};
pub use responses::{
    ActivityPointsResponse, BulkReviewResponse, IngestResponse, PointsSummaryResponse,
    SubmissionResponse,
};
