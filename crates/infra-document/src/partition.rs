// Partition key paths and values

use serde_json::Value;

use crate::error::DocumentError;

/// JSON path selecting a document's partition, e.g. `/category`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKeyPath {
    raw: String,
    segments: Vec<String>,
}

impl PartitionKeyPath {
    pub fn parse(path: &str) -> Result<Self, DocumentError> {
        let Some(rest) = path.strip_prefix('/') else {
            return Err(DocumentError::bad_request(format!(
                "partition key path '{}' must start with '/'",
                path
            )));
        };

        let segments: Vec<String> = rest.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(DocumentError::bad_request(format!(
                "partition key path '{}' has an empty segment",
                path
            )));
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when documents are partitioned by their own id
    pub fn is_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == "id"
    }

    /// Read the partition key value out of a document
    pub fn extract(&self, document: &Value) -> Result<PartitionKey, DocumentError> {
        let mut current = document;
        for segment in &self.segments {
            current = current.get(segment).ok_or_else(|| {
                DocumentError::bad_request(format!(
                    "document has no value at partition key path '{}'",
                    self.raw
                ))
            })?;
        }
        PartitionKey::new(current.clone())
    }
}

impl std::fmt::Display for PartitionKeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Scalar partition key value (string, number or bool)
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionKey(Value);

impl PartitionKey {
    pub fn new(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(Self(value)),
            other => Err(DocumentError::bad_request(format!(
                "partition key must be a string, number or bool, got {}",
                other
            ))),
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Canonical storage form; keeps "1" and 1 apart
    pub(crate) fn storage_key(&self) -> String {
        self.0.to_string()
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        Self(Value::Bool(value))
    }
}
