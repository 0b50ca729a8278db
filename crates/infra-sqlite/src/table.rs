// Entity <-> table mapping

use std::collections::HashMap;

use catalog_core::domain::{Customer, Entity, Order, OrderItem, OrderStatus, Product};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::statement::{SqlStatement, SqlValue};

/// Max bound parameters per `IN (...)` when loading owned rows
const OWNED_QUERY_CHUNK: usize = 500;

/// Maps an entity onto one table (plus any owned child rows).
///
/// `COLUMNS` pairs each serialized field with its column; the primary key
/// comes first and `values()` must follow the same order.
pub trait SqlTable: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn primary_key() -> &'static str {
        Self::COLUMNS[0].1
    }

    fn column_for(field: &str) -> Option<&'static str> {
        Self::COLUMNS
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, col)| *col)
    }

    fn values(&self) -> Vec<SqlValue>;

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;

    /// Statements that rewrite owned child rows after the parent write
    fn owned_rows(&self) -> Vec<SqlStatement> {
        Vec::new()
    }

    /// Queries loading the owned rows of the given parents
    fn owned_query(_ids: &[String]) -> Vec<SqlStatement> {
        Vec::new()
    }

    fn attach_owned(_entities: &mut [Self], _rows: &[SqliteRow]) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

impl SqlTable for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("name", "name"),
        ("description", "description"),
        ("price", "price"),
        ("category", "category"),
        ("stockQuantity", "stock_quantity"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.as_str().into(),
            self.name.as_str().into(),
            self.description.clone().into(),
            self.price.into(),
            self.category.as_str().into(),
            self.stock_quantity.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            category: row.try_get("category")?,
            stock_quantity: row.try_get("stock_quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SqlTable for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("firstName", "first_name"),
        ("lastName", "last_name"),
        ("email", "email"),
        ("phone", "phone"),
        ("country", "country"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.as_str().into(),
            self.first_name.as_str().into(),
            self.last_name.as_str().into(),
            self.email.as_str().into(),
            self.phone.clone().into(),
            self.country.as_str().into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Customer {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            country: row.try_get("country")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SqlTable for Order {
    const TABLE: &'static str = "orders";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("customerId", "customer_id"),
        ("orderDate", "order_date"),
        ("status", "status"),
        ("totalAmount", "total_amount"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.as_str().into(),
            self.customer_id.as_str().into(),
            self.order_date.into(),
            self.status.to_string().into(),
            self.total_amount.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })?;

        Ok(Order {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            order_date: row.try_get("order_date")?,
            status,
            items: Vec::new(),
            total_amount: row.try_get("total_amount")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    // Items are replaced wholesale on every write
    fn owned_rows(&self) -> Vec<SqlStatement> {
        let mut stmts =
            vec![SqlStatement::new("DELETE FROM order_items WHERE order_id = ?").bind(self.id.as_str())];

        for (line_no, item) in self.items.iter().enumerate() {
            stmts.push(
                SqlStatement::new(
                    "INSERT INTO order_items \
                     (order_id, line_no, product_id, product_name, quantity, unit_price) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(self.id.as_str())
                .bind(line_no as i64)
                .bind(item.product_id.as_str())
                .bind(item.product_name.as_str())
                .bind(item.quantity)
                .bind(item.unit_price),
            );
        }
        stmts
    }

    fn owned_query(ids: &[String]) -> Vec<SqlStatement> {
        ids.chunks(OWNED_QUERY_CHUNK)
            .map(|chunk| {
                let mut stmt = SqlStatement::new(
                    "SELECT order_id, line_no, product_id, product_name, quantity, unit_price \
                     FROM order_items WHERE order_id IN (",
                );
                for (i, id) in chunk.iter().enumerate() {
                    if i > 0 {
                        stmt.push_sql(", ");
                    }
                    stmt.push_bind(id.as_str());
                }
                stmt.push_sql(") ORDER BY order_id, line_no");
                stmt
            })
            .collect()
    }

    fn attach_owned(entities: &mut [Self], rows: &[SqliteRow]) -> Result<(), sqlx::Error> {
        let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: String = row.try_get("order_id")?;
            by_order.entry(order_id).or_default().push(OrderItem {
                product_id: row.try_get("product_id")?,
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                unit_price: row.try_get("unit_price")?,
            });
        }

        for order in entities.iter_mut() {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_columns_cover_fields<T: SqlTable>() {
        for field in T::FIELDS {
            assert!(
                T::column_for(field).is_some(),
                "{} field {} has no column",
                T::KIND,
                field
            );
        }
    }

    #[test]
    fn test_every_queryable_field_has_a_column() {
        assert_columns_cover_fields::<Product>();
        assert_columns_cover_fields::<Customer>();
        assert_columns_cover_fields::<Order>();
    }

    #[test]
    fn test_values_follow_column_order() {
        let customer = Customer::new("c-1", "Ada", "Lovelace", "ada@example.com", "UK");
        let values = customer.values();
        assert_eq!(values.len(), Customer::COLUMNS.len());
        assert_eq!(values[0], SqlValue::Text("c-1".into()));
        assert_eq!(values[4], SqlValue::Null);
    }

    #[test]
    fn test_order_owned_rows_replace_items() {
        let order = Order::new(
            "o-1",
            "c-1",
            1_000,
            vec![
                OrderItem::new("p-1", "Laptop", 1, 999.0),
                OrderItem::new("p-2", "Mouse", 2, 20.0),
            ],
        );
        let stmts = order.owned_rows();
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].sql.starts_with("DELETE FROM order_items"));
        assert_eq!(stmts[2].args[1], SqlValue::Integer(1));
    }

    #[test]
    fn test_owned_query_chunks_ids() {
        let ids: Vec<String> = (0..1_200).map(|i| format!("o-{}", i)).collect();
        let stmts = Order::owned_query(&ids);
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[2].args.len(), 200);
    }
}
