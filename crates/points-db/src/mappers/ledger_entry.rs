//! Ledger entry entity <-> model mapper

use points_core::{DomainError, EventKey, LedgerEntry, RecordId};

use crate::models::LedgerEntryModel;

impl TryFrom<LedgerEntryModel> for LedgerEntry {
    type Error = DomainError;

    fn try_from(model: LedgerEntryModel) -> Result<Self, Self::Error> {
        let activity = model
            .activity
            .parse()
            .map_err(|e: points_core::UnknownActivityError| DomainError::Internal(e.to_string()))?;
        let source = model
            .source
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;
        let event_key = match (model.external_source, model.external_event_id) {
            (Some(source), Some(event_id)) => Some(EventKey::new(source, event_id)),
            (None, None) => None,
            _ => {
                return Err(DomainError::Internal(
                    "ledger row with half an event key".to_string(),
                ))
            }
        };

        Ok(LedgerEntry {
            id: RecordId::new(model.id),
            user_id: RecordId::new(model.user_id),
            activity,
            delta: model.delta,
            source,
            event_key,
            occurred_at: model.occurred_at,
            metadata: model.metadata,
        })
    }
}
