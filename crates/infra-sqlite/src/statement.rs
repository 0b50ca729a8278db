// SQL statements with positional parameters, and predicate compilation

use catalog_core::error::{AppError, Result};
use catalog_core::port::{CompareOp, Predicate, Query, SortDirection};
use serde_json::Value;
use sqlx::query::Query as SqlxQuery;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use crate::table::SqlTable;

/// A bindable SQLite value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Convert a JSON scalar; booleans are stored as 0/1
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(SqlValue::Integer(i)),
                None => n.as_f64().map(SqlValue::Real).ok_or_else(|| {
                    AppError::InvalidArgument(format!("number out of range: {}", n))
                }),
            },
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            other => Err(AppError::InvalidArgument(format!(
                "cannot bind non-scalar value {}",
                other
            ))),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// SQL text plus positional arguments.
///
/// Owns its arguments so the same statement can be re-bound on every retry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `?` placeholder bound to `value`
    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.sql.push('?');
        self.args.push(value.into());
        self
    }

    /// Bind an argument for a placeholder already present in the SQL
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Build a sqlx query with all arguments bound
    pub fn query(&self) -> SqlxQuery<'_, Sqlite, SqliteArguments<'_>> {
        let mut query = sqlx::query(&self.sql);
        for arg in &self.args {
            query = match arg {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Real(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
            };
        }
        query
    }
}

fn column<T: SqlTable>(field: &str) -> Result<&'static str> {
    T::column_for(field).ok_or_else(|| {
        AppError::InvalidArgument(format!("field '{}' has no column in {}", field, T::TABLE))
    })
}

/// Append a WHERE-clause body for `predicate`.
///
/// SQL three-valued logic applies: comparisons against NULL columns are
/// unknown and never match, which mirrors the document store's treatment of
/// undefined properties.
pub fn push_predicate<T: SqlTable>(stmt: &mut SqlStatement, predicate: &Predicate) -> Result<()> {
    match predicate {
        Predicate::All => {
            stmt.push_sql("1 = 1");
        }
        Predicate::Compare { field, op, value } => {
            let col = column::<T>(field)?;
            match (op, value) {
                (CompareOp::Eq, Value::Null) => {
                    stmt.push_sql(col).push_sql(" IS NULL");
                }
                (CompareOp::Ne, Value::Null) => {
                    stmt.push_sql(col).push_sql(" IS NOT NULL");
                }
                (_, Value::Null) => {
                    return Err(AppError::InvalidArgument(format!(
                        "operator {} cannot compare '{}' with null",
                        op.as_sql(),
                        field
                    )));
                }
                (op, value) => {
                    stmt.push_sql(col)
                        .push_sql(" ")
                        .push_sql(op.as_sql())
                        .push_sql(" ")
                        .push_bind(SqlValue::from_json(value)?);
                }
            }
        }
        Predicate::Contains { field, needle } => {
            let col = column::<T>(field)?;
            stmt.push_sql("instr(")
                .push_sql(col)
                .push_sql(", ")
                .push_bind(needle.as_str())
                .push_sql(") > 0");
        }
        Predicate::In { field, values } => {
            let col = column::<T>(field)?;
            if values.is_empty() {
                stmt.push_sql("0 = 1");
            } else {
                stmt.push_sql(col).push_sql(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        stmt.push_sql(", ");
                    }
                    stmt.push_bind(SqlValue::from_json(value)?);
                }
                stmt.push_sql(")");
            }
        }
        Predicate::And(parts) => push_joined::<T>(stmt, parts, " AND ", "1 = 1")?,
        Predicate::Or(parts) => push_joined::<T>(stmt, parts, " OR ", "0 = 1")?,
        Predicate::Not(inner) => {
            stmt.push_sql("NOT (");
            push_predicate::<T>(stmt, inner)?;
            stmt.push_sql(")");
        }
    }
    Ok(())
}

fn push_joined<T: SqlTable>(
    stmt: &mut SqlStatement,
    parts: &[Predicate],
    separator: &str,
    empty: &str,
) -> Result<()> {
    if parts.is_empty() {
        stmt.push_sql(empty);
        return Ok(());
    }
    stmt.push_sql("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            stmt.push_sql(separator);
        }
        push_predicate::<T>(stmt, part)?;
    }
    stmt.push_sql(")");
    Ok(())
}

fn column_list<T: SqlTable>() -> String {
    T::COLUMNS
        .iter()
        .map(|(_, col)| *col)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT ? OFFSET ?]`
pub fn select_statement<T: SqlTable>(query: &Query) -> Result<SqlStatement> {
    let mut stmt = SqlStatement::new(format!("SELECT {} FROM {}", column_list::<T>(), T::TABLE));

    if let Some(filter) = &query.filter {
        stmt.push_sql(" WHERE ");
        push_predicate::<T>(&mut stmt, filter)?;
    }

    if !query.order_by.is_empty() {
        stmt.push_sql(" ORDER BY ");
        for (i, key) in query.order_by.iter().enumerate() {
            if i > 0 {
                stmt.push_sql(", ");
            }
            stmt.push_sql(column::<T>(&key.field)?);
            stmt.push_sql(match key.direction {
                SortDirection::Ascending => " ASC",
                SortDirection::Descending => " DESC",
            });
        }
    }

    match (query.take, query.skip) {
        (None, None) => {}
        (take, skip) => {
            // SQLite needs a LIMIT before OFFSET; -1 means unbounded
            let limit = take.map(|t| t as i64).unwrap_or(-1);
            stmt.push_sql(" LIMIT ").push_bind(limit);
            if let Some(skip) = skip {
                stmt.push_sql(" OFFSET ").push_bind(skip as i64);
            }
        }
    }

    Ok(stmt)
}

/// `SELECT COUNT(*) FROM <table> [WHERE ..]`
pub fn count_statement<T: SqlTable>(predicate: Option<&Predicate>) -> Result<SqlStatement> {
    let mut stmt = SqlStatement::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
    if let Some(predicate) = predicate {
        stmt.push_sql(" WHERE ");
        push_predicate::<T>(&mut stmt, predicate)?;
    }
    Ok(stmt)
}

pub fn select_by_id<T: SqlTable>(id: &str) -> SqlStatement {
    SqlStatement::new(format!(
        "SELECT {} FROM {} WHERE {} = ?",
        column_list::<T>(),
        T::TABLE,
        T::primary_key()
    ))
    .bind(id)
}

pub fn insert_statement<T: SqlTable>(entity: &T) -> SqlStatement {
    let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
    let mut stmt = SqlStatement::new(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        column_list::<T>(),
        placeholders
    ));
    stmt.args = entity.values();
    stmt
}

/// Full-row update by primary key; `created_at` is never rewritten
pub fn update_statement<T: SqlTable>(entity: &T) -> SqlStatement {
    let pk = T::primary_key();
    let mut assignments = Vec::new();
    let mut args = Vec::new();
    let mut id_arg = SqlValue::Null;

    for ((_, col), value) in T::COLUMNS.iter().zip(entity.values()) {
        if *col == pk {
            id_arg = value;
        } else if *col != "created_at" {
            assignments.push(format!("{} = ?", col));
            args.push(value);
        }
    }
    args.push(id_arg);

    SqlStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            T::TABLE,
            assignments.join(", "),
            pk
        ),
        args,
    }
}

pub fn delete_statement<T: SqlTable>(id: &str) -> SqlStatement {
    SqlStatement::new(format!("DELETE FROM {} WHERE {} = ?", T::TABLE, T::primary_key())).bind(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::domain::Product;

    fn where_clause(predicate: &Predicate) -> SqlStatement {
        let mut stmt = SqlStatement::default();
        push_predicate::<Product>(&mut stmt, predicate).unwrap();
        stmt
    }

    #[test]
    fn test_compare_maps_field_to_column() {
        let stmt = where_clause(&Predicate::ge("stockQuantity", 5));
        assert_eq!(stmt.sql, "stock_quantity >= ?");
        assert_eq!(stmt.args, vec![SqlValue::Integer(5)]);
    }

    #[test]
    fn test_null_equality_uses_is_null() {
        let stmt = where_clause(&Predicate::eq("updatedAt", Value::Null));
        assert_eq!(stmt.sql, "updated_at IS NULL");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_nested_boolean_logic() {
        let predicate = Predicate::eq("category", "Books")
            .and(Predicate::gt("price", 9.5).or(Predicate::contains("name", "Rust")));
        let stmt = where_clause(&!predicate);
        assert_eq!(
            stmt.sql,
            "NOT ((category = ? AND (price > ? OR instr(name, ?) > 0)))"
        );
        assert_eq!(stmt.args.len(), 3);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let stmt = where_clause(&Predicate::is_in("category", Vec::<String>::new()));
        assert_eq!(stmt.sql, "0 = 1");
    }

    #[test]
    fn test_select_with_window() {
        let query = Query::new()
            .filter(Predicate::eq("category", "Books"))
            .order_by("price", SortDirection::Descending)
            .skip(20)
            .take(10);
        let stmt = select_statement::<Product>(&query).unwrap();
        assert!(stmt.sql.ends_with("WHERE category = ? ORDER BY price DESC LIMIT ? OFFSET ?"));
        assert_eq!(
            stmt.args,
            vec![
                SqlValue::Text("Books".into()),
                SqlValue::Integer(10),
                SqlValue::Integer(20)
            ]
        );
    }

    #[test]
    fn test_skip_without_take_uses_unbounded_limit() {
        let stmt = select_statement::<Product>(&Query::new().skip(5)).unwrap();
        assert!(stmt.sql.ends_with("LIMIT ? OFFSET ?"));
        assert_eq!(stmt.args, vec![SqlValue::Integer(-1), SqlValue::Integer(5)]);
    }

    #[test]
    fn test_update_skips_created_at_and_binds_id_last() {
        let product = Product::new("p-1", "Laptop", 10.0, "Electronics");
        let stmt = update_statement(&product);
        assert!(!stmt.sql.contains("created_at"));
        assert!(stmt.sql.ends_with("WHERE id = ?"));
        assert_eq!(stmt.args.last(), Some(&SqlValue::Text("p-1".into())));
    }

    #[test]
    fn test_unknown_field_is_invalid_argument() {
        let mut stmt = SqlStatement::default();
        let err = push_predicate::<Product>(&mut stmt, &Predicate::eq("colour", "red")).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
