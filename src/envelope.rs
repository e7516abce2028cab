//! Response envelope
//!
//! Every tool result leaves the dispatcher as an [`Envelope`]. The `success`
//! flag only exists in the serialized form and is derived from the variant.

use crate::error::{ErrorKind, ToolError};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Map, Value};

/// A scope (zone/region) whose sub-call failed during a fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeFailure {
    pub scope: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ScopeFailure {
    pub fn new(scope: &str, err: &ToolError) -> Self {
        Self {
            scope: scope.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Successful result of a domain operation, before normalization
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    payload: Map<String, Value>,
    failures: Vec<ScopeFailure>,
}

impl ToolOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{message}` payload used by mutating tools
    pub fn message(message: impl Into<String>) -> Self {
        let mut output = Self::new();
        output
            .payload
            .insert("message".to_string(), Value::String(message.into()));
        output
    }

    /// Add one payload field
    pub fn with<T: serde::Serialize>(mut self, key: &str, value: &T) -> Result<Self, ToolError> {
        let value = serde_json::to_value(value)
            .map_err(|e| ToolError::Internal(format!("failed to serialize '{}': {}", key, e)))?;
        self.payload.insert(key.to_string(), value);
        Ok(self)
    }

    /// Use the fields of a record as the payload
    pub fn from_record<T: serde::Serialize>(record: &T) -> Result<Self, ToolError> {
        match serde_json::to_value(record) {
            Ok(Value::Object(payload)) => Ok(Self {
                payload,
                failures: Vec::new(),
            }),
            Ok(_) => Err(ToolError::Internal("record did not serialize to an object".into())),
            Err(e) => Err(ToolError::Internal(format!("failed to serialize record: {}", e))),
        }
    }

    pub fn with_failures(mut self, failures: Vec<ScopeFailure>) -> Self {
        self.failures.extend(failures);
        self
    }

    pub fn failures(&self) -> &[ScopeFailure] {
        &self.failures
    }
}

/// Uniform success/error wrapper returned by every tool
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success {
        payload: Map<String, Value>,
    },
    Error {
        kind: ErrorKind,
        message: String,
        details: Option<Value>,
    },
}

impl Envelope {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }

    pub fn to_value(&self) -> Value {
        // Map<String, Value> serialization cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success { payload } => {
                let mut map = serializer.serialize_map(Some(payload.len() + 1))?;
                map.serialize_entry("success", &true)?;
                for (key, value) in payload.iter().filter(|(k, _)| k.as_str() != "success") {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            },
            Self::Error {
                kind,
                message,
                details,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", kind)?;
                map.serialize_entry("message", message)?;
                if let Some(details) = details {
                    map.serialize_entry("details", details)?;
                }
                map.end()
            },
        }
    }
}

/// Turn an operation outcome into an envelope
pub fn normalize(result: Result<ToolOutput, ToolError>) -> Envelope {
    match result {
        Ok(output) => {
            let ToolOutput {
                mut payload,
                failures,
            } = output;
            if let Some(first) = failures.first() {
                payload.insert("details".to_string(), partial_details(first.kind, &failures));
            }
            Envelope::Success { payload }
        },
        Err(err) => {
            let details = match &err {
                ToolError::Validation(v) => Some(json!({ "field": v.field, "reason": v.reason })),
                ToolError::Auth(a) => Some(json!({ "auth": a.sub_kind() })),
                _ => None,
            };
            Envelope::Error {
                kind: err.kind(),
                message: err.to_string(),
                details,
            }
        },
    }
}

fn partial_details(first_kind: ErrorKind, failures: &[ScopeFailure]) -> Value {
    let failed_scopes: Vec<&str> = failures.iter().map(|f| f.scope.as_str()).collect();
    let scope_errors: Vec<Value> = failures
        .iter()
        .map(|f| json!({ "scope": f.scope, "error": f.kind, "message": f.message }))
        .collect();
    json!({
        "failed_scopes": failed_scopes,
        "error": first_kind,
        "scope_errors": scope_errors,
    })
}
