// Product Domain Model

use serde::{Deserialize, Serialize};

use super::entity::{ensure_id, ensure_not_blank, Entity, EntityId};
use super::error::{DomainError, Result};

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    pub stock_quantity: i64,

    pub created_at: i64, // epoch ms
    pub updated_at: Option<i64>,
}

impl Product {
    /// Create an unsaved product (timestamps are stamped by the repository)
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
            category: category.into(),
            stock_quantity: 0,
            created_at: 0,
            updated_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_stock(mut self, stock_quantity: i64) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }
}

impl Entity for Product {
    const KIND: &'static str = "product";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "price",
        "category",
        "stockQuantity",
        "createdAt",
        "updatedAt",
    ];
    const TEXT_FIELDS: &'static [&'static str] = &["id", "name", "description", "category"];

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
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("category", &self.category)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::ValidationError(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::ValidationError(
                "stockQuantity cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_is_unstamped() {
        let product = Product::new("p-1", "Laptop", 999.99, "Electronics");
        assert_eq!(product.created_at, 0);
        assert!(product.updated_at.is_none());
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_negative_price_rejected() {
        let product = Product::new("p-1", "Laptop", -1.0, "Electronics");
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let product = Product::new("p-1", "Laptop", 10.0, "Electronics").with_stock(3);
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["stockQuantity"], 3);
        assert!(value.get("stock_quantity").is_none());
    }
}
