//! Audit entry entity <-> model mapper

use points_core::{AuditEntry, DomainError, RecordId};

use crate::models::AuditLogModel;

impl TryFrom<AuditLogModel> for AuditEntry {
    type Error = DomainError;

    fn try_from(model: AuditLogModel) -> Result<Self, Self::Error> {
        let action = model
            .action
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;
        Ok(AuditEntry {
            id: RecordId::new(model.id),
            actor_id: RecordId::new(model.actor_id),
            action,
            target_type: model.target_type,
            target_id: model.target_id,
            metadata: model.metadata,
            created_at: model.created_at,
        })
    }
}
