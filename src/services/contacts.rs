use crate::{
    entities::contact,
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Body of `POST /user/contact/`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactInput {
    #[serde(default)]
    #[validate(length(max = 50), custom = "validate_not_blank")]
    pub city: String,
    #[serde(default)]
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub street: String,
    #[serde(default)]
    #[validate(length(max = 15), custom = "validate_not_blank")]
    pub house: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub structure: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub building: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub apartment: String,
    #[serde(default)]
    #[validate(length(max = 20), custom = "validate_not_blank")]
    pub phone: String,
}

/// Body of `PUT /user/contact/`; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactUpdate {
    /// Used when the id is not part of the path
    #[serde(default)]
    pub id: Option<i32>,
    #[validate(length(max = 50), custom = "validate_not_blank")]
    pub city: Option<String>,
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub street: Option<String>,
    #[validate(length(max = 15), custom = "validate_not_blank")]
    pub house: Option<String>,
    #[validate(length(max = 15))]
    pub structure: Option<String>,
    #[validate(length(max = 15))]
    pub building: Option<String>,
    #[validate(length(max = 15))]
    pub apartment: Option<String>,
    #[validate(length(max = 20), custom = "validate_not_blank")]
    pub phone: Option<String>,
}

/// Contacts are always scoped to their owner: another user's contact is
/// reported as missing.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<DatabaseConnection>,
}

impl ContactService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, user_id: i32) -> Result<Vec<contact::Model>, ServiceError> {
        Ok(contact::Entity::find()
            .filter(contact::Column::UserId.eq(user_id))
            .order_by_asc(contact::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        user_id: i32,
        input: ContactInput,
    ) -> Result<contact::Model, ServiceError> {
        input.validate()?;

        let created = contact::ActiveModel {
            user_id: Set(user_id),
            city: Set(input.city.trim().to_string()),
            street: Set(input.street.trim().to_string()),
            house: Set(input.house.trim().to_string()),
            structure: Set(input.structure.trim().to_string()),
            building: Set(input.building.trim().to_string()),
            apartment: Set(input.apartment.trim().to_string()),
            phone: Set(input.phone.trim().to_string()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(contact_id = created.id, "contact created");
        Ok(created)
    }

    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        user_id: i32,
        contact_id: i32,
        update: ContactUpdate,
    ) -> Result<contact::Model, ServiceError> {
        update.validate()?;

        let existing = self.find_owned(user_id, contact_id).await?;
        let mut active: contact::ActiveModel = existing.into();
        let fields = [
            (update.city, &mut active.city),
            (update.street, &mut active.street),
            (update.house, &mut active.house),
            (update.structure, &mut active.structure),
            (update.building, &mut active.building),
            (update.apartment, &mut active.apartment),
            (update.phone, &mut active.phone),
        ];
        for (value, column) in fields {
            if let Some(value) = value {
                *column = Set(value.trim().to_string());
            }
        }

        Ok(active.update(&*self.db).await?)
    }

    /// Deletes the caller's contacts among `ids`. Orders placed with a deleted
    /// contact are removed along with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i32, ids: Vec<i32>) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "items must not be empty".to_string(),
            ));
        }

        let deleted = contact::Entity::delete_many()
            .filter(contact::Column::UserId.eq(user_id))
            .filter(contact::Column::Id.is_in(ids))
            .exec(&*self.db)
            .await?
            .rows_affected;
        if deleted == 0 {
            return Err(ServiceError::NotFound("Contact not found".to_string()));
        }

        info!(deleted, "contacts deleted");
        Ok(deleted)
    }

    async fn find_owned(&self, user_id: i32, contact_id: i32) -> Result<contact::Model, ServiceError> {
        contact::Entity::find_by_id(contact_id)
            .filter(contact::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Contact {} not found", contact_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ContactInput {
        ContactInput {
            city: "Springfield".into(),
            street: "Evergreen Terrace".into(),
            house: "742".into(),
            structure: String::new(),
            building: String::new(),
            apartment: String::new(),
            phone: "+1 555 0100".into(),
        }
    }

    #[test]
    fn required_fields_must_not_be_blank() {
        assert!(input().validate().is_ok());

        let mut blank_city = input();
        blank_city.city = "   ".into();
        assert!(blank_city.validate().is_err());

        let mut long_phone = input();
        long_phone.phone = "1".repeat(21);
        assert!(long_phone.validate().is_err());
    }

    #[test]
    fn partial_update_only_checks_present_fields() {
        assert!(ContactUpdate::default().validate().is_ok());

        let update = ContactUpdate {
            house: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
