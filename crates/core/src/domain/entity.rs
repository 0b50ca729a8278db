// Entity base contract shared by every stored record

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{DomainError, Result};

/// Entity ID (string form of a UUID v4, or caller supplied)
pub type EntityId = String;

/// Identity and audit fields every persisted record carries.
///
/// `created_at` is stamped by the adapter on insert and never changes
/// afterwards; `updated_at` stays `None` until the first update. Both are
/// epoch milliseconds.
///
/// `FIELDS` lists the serialized (camelCase) field names that predicates and
/// sort keys may reference. Anything else is rejected before reaching a
/// backend.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Short name used in logs and error messages
    const KIND: &'static str;

    /// Queryable field names, in serialized form
    const FIELDS: &'static [&'static str];

    /// Subset of `FIELDS` holding strings; only these accept `Contains`
    const TEXT_FIELDS: &'static [&'static str];

    fn id(&self) -> &str;

    fn created_at(&self) -> i64;

    fn updated_at(&self) -> Option<i64>;

    /// Stamp insert time and clear any update time
    fn stamp_created(&mut self, now_millis: i64);

    fn stamp_updated(&mut self, now_millis: i64);

    /// Entity-level checks run before every write
    fn validate(&self) -> Result<()> {
        ensure_id(self.id())
    }

    fn is_queryable(field: &str) -> bool {
        Self::FIELDS.contains(&field)
    }

    fn is_text(field: &str) -> bool {
        Self::TEXT_FIELDS.contains(&field)
    }
}

pub(crate) fn ensure_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(DomainError::ValidationError(
            "entity id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn ensure_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}
