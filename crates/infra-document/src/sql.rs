// Document SQL rendering and predicate evaluation against JSON documents

use std::cmp::Ordering;

use catalog_core::port::{CompareOp, Predicate, SortDirection, SortKey};
use serde_json::Value;

/// Render a predicate as a parameterized document SQL condition.
///
/// Parameters are named `@p0`, `@p1`, ... in order of appearance.
pub(crate) fn render_condition(predicate: &Predicate, params: &mut Vec<(String, Value)>) -> String {
    match predicate {
        Predicate::All => "true".to_string(),
        Predicate::Compare { field, op: CompareOp::Eq, value: Value::Null } => {
            format!("IS_NULL(c.{})", field)
        }
        Predicate::Compare { field, op: CompareOp::Ne, value: Value::Null } => {
            format!("NOT IS_NULL(c.{})", field)
        }
        Predicate::Compare { field, op, value } => {
            let name = push_param(params, value.clone());
            format!("c.{} {} {}", field, op.as_sql(), name)
        }
        Predicate::Contains { field, needle } => {
            let name = push_param(params, Value::String(needle.clone()));
            format!("CONTAINS(c.{}, {})", field, name)
        }
        Predicate::In { field, values } => {
            if values.is_empty() {
                return "false".to_string();
            }
            let names: Vec<String> = values
                .iter()
                .map(|v| push_param(params, v.clone()))
                .collect();
            format!("c.{} IN ({})", field, names.join(", "))
        }
        Predicate::And(parts) => join(parts, " AND ", "true", params),
        Predicate::Or(parts) => join(parts, " OR ", "false", params),
        Predicate::Not(inner) => format!("NOT ({})", render_condition(inner, params)),
    }
}

fn join(parts: &[Predicate], separator: &str, empty: &str, params: &mut Vec<(String, Value)>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts.iter().map(|p| render_condition(p, params)).collect();
    format!("({})", rendered.join(separator))
}

fn push_param(params: &mut Vec<(String, Value)>, value: Value) -> String {
    let name = format!("@p{}", params.len());
    params.push((name.clone(), value));
    name
}

pub(crate) fn render_order_by(keys: &[SortKey]) -> String {
    let keys: Vec<String> = keys
        .iter()
        .map(|k| {
            let dir = match k.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            format!("c.{} {}", k.field, dir)
        })
        .collect();
    keys.join(", ")
}

/// Evaluate with document SQL semantics.
///
/// `None` is "undefined": a missing property or a comparison between
/// mismatched types. Only `Some(true)` selects a document.
pub(crate) fn evaluate(predicate: &Predicate, doc: &Value) -> Option<bool> {
    match predicate {
        Predicate::All => Some(true),
        // Null equality is a presence test; a missing property counts as null
        Predicate::Compare { field, op: CompareOp::Eq, value: Value::Null } => {
            Some(doc.get(field).map_or(true, Value::is_null))
        }
        Predicate::Compare { field, op: CompareOp::Ne, value: Value::Null } => {
            Some(!doc.get(field).map_or(true, Value::is_null))
        }
        Predicate::Compare { field, op, value } => {
            let actual = doc.get(field)?;
            compare(*op, actual, value)
        }
        Predicate::Contains { field, needle } => match doc.get(field)? {
            Value::String(s) => Some(s.contains(needle.as_str())),
            _ => None,
        },
        Predicate::In { field, values } => {
            let actual = doc.get(field)?;
            let mut result = Some(false);
            for candidate in values {
                match compare(CompareOp::Eq, actual, candidate) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        Predicate::And(parts) => {
            let mut result = Some(true);
            for part in parts {
                match evaluate(part, doc) {
                    Some(false) => return Some(false),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        Predicate::Or(parts) => {
            let mut result = Some(false);
            for part in parts {
                match evaluate(part, doc) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        Predicate::Not(inner) => evaluate(inner, doc).map(|b| !b),
    }
}

fn compare(op: CompareOp, actual: &Value, expected: &Value) -> Option<bool> {
    let ordering = match (actual, expected) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?)?,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => return None,
    };

    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
    })
}

// undefined < null < false/true < numbers < strings < everything else
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(_) => 5,
    }
}

fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Ordering for `ORDER BY`; documents compare equal when `keys` is empty
pub(crate) fn compare_documents(keys: &[SortKey], a: &Value, b: &Value) -> Ordering {
    for key in keys {
        let ordering = order_values(a.get(&key.field), b.get(&key.field));
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
