//! User entity <-> model mapper

use points_core::{DomainError, RecordId, User};

use crate::models::UserModel;

impl TryFrom<UserModel> for User {
    type Error = DomainError;

    fn try_from(model: UserModel) -> Result<Self, Self::Error> {
        let role = model
            .role
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;
        Ok(User {
            id: RecordId::new(model.id),
            email: model.email,
            display_name: model.display_name,
            role,
            ineligible: model.ineligible,
            lms_contact_id: model.lms_contact_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
