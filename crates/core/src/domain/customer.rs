// Customer Domain Model

use serde::{Deserialize, Serialize};

use super::entity::{ensure_id, ensure_not_blank, Entity, EntityId};
use super::error::{DomainError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,

    pub created_at: i64, // epoch ms
    pub updated_at: Option<i64>,
}

impl Customer {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
            country: country.into(),
            created_at: 0,
            updated_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Customer {
    const KIND: &'static str = "customer";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "firstName",
        "lastName",
        "email",
        "phone",
        "country",
        "createdAt",
        "updatedAt",
    ];
    const TEXT_FIELDS: &'static [&'static str] =
        &["id", "firstName", "lastName", "email", "phone", "country"];

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn updated_at(&self) -> Option<i64> {
        self.updated_at
    }

    fn stamp_created(&mut self, now_millis: i64) {
        self.created_at = now_millis;
        self.updated_at = None;
    }

    fn stamp_updated(&mut self, now_millis: i64) {
        self.updated_at = Some(now_millis);
    }

    fn validate(&self) -> Result<()> {
        ensure_id(&self.id)?;
        ensure_not_blank("firstName", &self.first_name)?;
        ensure_not_blank("lastName", &self.last_name)?;
        ensure_not_blank("country", &self.country)?;
        if !self.email.contains('@') {
            return Err(DomainError::ValidationError(format!(
                "email is not valid: {}",
                self.email
            )));
        }
        Ok(())
    }
}
