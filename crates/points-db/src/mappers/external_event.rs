//! External event entity <-> model mapper

use points_core::{DomainError, ExternalEvent, RecordId};

use crate::models::ExternalEventModel;

impl TryFrom<ExternalEventModel> for ExternalEvent {
    type Error = DomainError;

    fn try_from(model: ExternalEventModel) -> Result<Self, Self::Error> {
        let status = model
            .status
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;
        Ok(ExternalEvent {
            id: model.id,
            event_id: model.event_id,
            signal: model.signal,
            contact_id: model.contact_id,
            email: model.email,
            matched_user_id: model.matched_user_id.map(RecordId::new),
            status,
            raw_payload: model.raw_payload,
            received_at: model.received_at,
            updated_at: model.updated_at,
        })
    }
}
