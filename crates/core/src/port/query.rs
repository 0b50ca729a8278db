// Query Model - backend-neutral predicates, sorting and paging

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Entity;
use crate::error::{AppError, Result};

/// Comparison operator for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Operator token shared by both SQL dialects
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// Filter expression over the serialized fields of an entity.
///
/// Adapters translate the tree into their native query language; field
/// names are checked against `Entity::FIELDS` first so a malformed
/// predicate never reaches a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every record
    All,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Substring match on a string field
    Contains {
        field: String,
        needle: String,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::Or(mut left), p) => {
                left.push(p);
                Predicate::Or(left)
            }
            (left, right) => Predicate::Or(vec![left, right]),
        }
    }

    /// Check that every referenced field is queryable on `T` and that values are scalars
    pub fn validate_for<T: Entity>(&self) -> Result<()> {
        match self {
            Predicate::All => Ok(()),
            Predicate::Compare { field, value, .. } => {
                check_field::<T>(field)?;
                check_scalar(field, value)
            }
            Predicate::Contains { field, .. } => {
                check_field::<T>(field)?;
                check_text::<T>(field)
            }
            Predicate::In { field, values } => {
                check_field::<T>(field)?;
                values.iter().try_for_each(|v| check_scalar(field, v))
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().try_for_each(|p| p.validate_for::<T>())
            }
            Predicate::Not(inner) => inner.validate_for::<T>(),
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

fn check_field<T: Entity>(field: &str) -> Result<()> {
    if T::is_queryable(field) {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "field '{}' is not queryable on {}",
            field,
            T::KIND
        )))
    }
}

fn check_text<T: Entity>(field: &str) -> Result<()> {
    if T::is_text(field) {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "contains needs a text field, '{}' on {} is not one",
            field,
            T::KIND
        )))
    }
}

fn check_scalar(field: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(AppError::InvalidArgument(format!(
            "predicate value for '{}' must be a scalar",
            field
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Composable query: filter, ordering and a skip/take window.
///
/// Built with `Repository::query()` and executed with `Repository::fetch()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filter: Option<Predicate>,
    pub order_by: Vec<SortKey>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter; repeated calls are ANDed together
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn skip(mut self, count: u64) -> Self {
        self.skip = Some(count);
        self
    }

    pub fn take(mut self, count: u64) -> Self {
        self.take = Some(count);
        self
    }

    pub fn validate_for<T: Entity>(&self) -> Result<()> {
        if let Some(filter) = &self.filter {
            filter.validate_for::<T>()?;
        }
        for key in &self.order_by {
            check_field::<T>(&key.field)?;
        }
        Ok(())
    }
}

/// Build the query `get_paged` runs for one page.
///
/// Pages are 1-indexed. Results are ordered by creation time then id so a
/// page boundary is stable across calls.
pub fn page_query(page_number: u32, page_size: u32, predicate: Option<&Predicate>) -> Result<Query> {
    if page_number < 1 {
        return Err(AppError::InvalidArgument(
            "page number must be at least 1".to_string(),
        ));
    }
    if page_size < 1 {
        return Err(AppError::InvalidArgument(
            "page size must be at least 1".to_string(),
        ));
    }

    let mut query = Query::new()
        .order_by("createdAt", SortDirection::Ascending)
        .order_by("id", SortDirection::Ascending)
        .skip(u64::from(page_number - 1) * u64::from(page_size))
        .take(u64::from(page_size));
    if let Some(predicate) = predicate {
        query = query.filter(predicate.clone());
    }
    Ok(query)
}

/// One page of results plus the size of the whole filtered set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}
