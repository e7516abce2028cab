//! Request validation
//!
//! Each tool declares an [`ArgSchema`]: a static table of fields with their
//! type, constraint and default. [`ArgSchema::validate`] is the single entry
//! point that turns a loosely-typed argument bag into a checked, coerced JSON
//! object which then deserializes into the tool's typed request.

use crate::error::ValidationError;
use serde_json::{json, Map, Value};

/// Constraint applied to string values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    NonEmpty,
    ProjectId,
    BucketName,
    /// Compute resource names: lowercase letter first, then `[a-z0-9-]`
    ResourceName,
    /// Zone / region / location identifiers
    Location,
    /// `YYYY-MM-DD`
    Date,
    /// `<n>[smhd]`, e.g. `1h`
    Interval,
    /// `<service domain>/<path>`
    MetricType,
    Email,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text(TextRule),
    TextList(TextRule),
    Integer { min: i64, max: i64 },
    Boolean,
    Choice(&'static [&'static str]),
    ChoiceList(&'static [&'static str]),
}

/// Documented default applied when an optional field is omitted
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    Text(&'static str),
    Integer(i64),
    Boolean(bool),
    List(&'static [&'static str]),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.to_string()),
            Self::Integer(n) => Value::from(n),
            Self::Boolean(b) => Value::Bool(b),
            Self::List(items) => Value::Array(items.iter().map(|s| Value::from(*s)).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// Declarative argument schema of one tool
#[derive(Debug, Clone, Copy)]
pub struct ArgSchema {
    pub fields: &'static [FieldSpec],
}

impl ArgSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Check and coerce `raw` against the schema
    ///
    /// `null` counts as absent. Unknown argument names are rejected.
    pub fn validate(&self, raw: &Value) -> Result<Map<String, Value>, ValidationError> {
        let empty = Map::new();
        let args = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ValidationError::new("arguments", "expected an object")),
        };

        if let Some(unknown) = args.keys().find(|k| self.field(k).is_none()) {
            return Err(ValidationError::new(unknown.as_str(), "unknown argument"));
        }

        let mut out = Map::new();
        for spec in self.fields {
            match args.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    out.insert(spec.name.to_string(), coerce(spec, value)?);
                },
                None if spec.required => return Err(ValidationError::missing(spec.name)),
                None => {
                    if let Some(default) = spec.default {
                        out.insert(spec.name.to_string(), default.to_value());
                    }
                },
            }
        }
        Ok(out)
    }

    /// JSON-schema rendering for tool catalogs
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in self.fields {
            let mut prop = match spec.kind {
                FieldKind::Text(_) => json!({ "type": "string" }),
                FieldKind::TextList(_) => json!({ "type": "array", "items": { "type": "string" } }),
                FieldKind::Integer { min, max } => {
                    json!({ "type": "integer", "minimum": min, "maximum": max })
                },
                FieldKind::Boolean => json!({ "type": "boolean" }),
                FieldKind::Choice(options) => json!({ "type": "string", "enum": options }),
                FieldKind::ChoiceList(options) => {
                    json!({ "type": "array", "items": { "type": "string", "enum": options } })
                },
            };
            if let Some(obj) = prop.as_object_mut() {
                obj.insert("description".to_string(), Value::from(spec.description));
                if let Some(default) = spec.default {
                    obj.insert("default".to_string(), default.to_value());
                }
            }
            properties.insert(spec.name.to_string(), prop);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_fields().collect::<Vec<_>>(),
            "additionalProperties": false,
        })
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<Value, ValidationError> {
    let field = spec.name;
    match spec.kind {
        FieldKind::Text(rule) => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(field, "expected string"))?;
            check_text(field, rule, s).map(Value::String)
        },
        FieldKind::TextList(rule) => string_list(field, value)?
            .into_iter()
            .map(|s| check_text(field, rule, &s).map(Value::String))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        FieldKind::Integer { min, max } => {
            let n = as_integer(value).ok_or_else(|| ValidationError::new(field, "expected integer"))?;
            if n < min || n > max {
                return Err(ValidationError::new(
                    field,
                    format!("must be between {} and {}", min, max),
                ));
            }
            Ok(Value::from(n))
        },
        FieldKind::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(ValidationError::new(field, "expected boolean")),
        },
        FieldKind::Choice(options) => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(field, "expected string"))?;
            choose(field, options, s).map(Value::from)
        },
        FieldKind::ChoiceList(options) => {
            let items = string_list(field, value)?;
            if items.is_empty() {
                return Err(ValidationError::new(field, "must not be empty"));
            }
            items
                .iter()
                .map(|s| choose(field, options, s).map(Value::from))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        },
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts an array of strings, or one string holding comma-separated items
fn string_list(field: &str, value: &Value) -> Result<Vec<String>, ValidationError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ValidationError::new(field, "expected list of strings"))
            })
            .collect(),
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        _ => Err(ValidationError::new(field, "expected list of strings")),
    }
}

fn choose(field: &str, options: &[&'static str], value: &str) -> Result<&'static str, ValidationError> {
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(value.trim()))
        .copied()
        .ok_or_else(|| {
            ValidationError::new(
                field,
                format!("'{}' is not one of: {}", value, options.join(", ")),
            )
        })
}

fn check_text(field: &str, rule: TextRule, value: &str) -> Result<String, ValidationError> {
    let fail = |reason: &str| Err(ValidationError::new(field, reason));

    if value.trim().is_empty() {
        return fail("must not be empty");
    }

    match rule {
        TextRule::NonEmpty => {},
        TextRule::ProjectId => {
            if value.len() > 63 {
                return fail("must be at most 63 characters");
            }
            if !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
            {
                return fail("must contain only letters, digits, '-', '_', '.' and ':'");
            }
        },
        TextRule::BucketName => {
            if value.len() < 3 || value.len() > 63 {
                return fail("must be between 3 and 63 characters");
            }
            if value != value.to_lowercase() {
                return fail("must be lowercase");
            }
            if !value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
            {
                return fail("must contain only lowercase letters, digits, '-', '_' and '.'");
            }
        },
        TextRule::ResourceName => {
            if value.len() > 63 {
                return fail("must be at most 63 characters");
            }
            if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
                return fail("must start with a lowercase letter");
            }
            if !value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return fail("must contain only lowercase letters, digits and '-'");
            }
        },
        TextRule::Location => {
            if value.len() > 63
                || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return fail("must contain only letters, digits and '-'");
            }
        },
        TextRule::Date => {
            if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                return fail("expected date in YYYY-MM-DD format");
            }
        },
        TextRule::Interval => {
            if parse_interval(value).is_none() {
                return fail("expected interval like 30s, 5m, 1h or 7d");
            }
        },
        TextRule::MetricType => {
            let valid = value
                .split_once('/')
                .map(|(domain, path)| domain.contains('.') && !path.is_empty())
                .unwrap_or(false);
            if !valid || value.chars().any(char::is_whitespace) {
                return fail("expected metric type like compute.googleapis.com/instance/cpu/utilization");
            }
        },
        TextRule::Email => {
            let valid = value
                .split_once('@')
                .map(|(user, domain)| !user.is_empty() && domain.contains('.'))
                .unwrap_or(false);
            if !valid {
                return fail("expected an email address");
            }
        },
    }

    Ok(value.to_string())
}

/// "90s" -> 90, "1h" -> 3600
pub fn parse_interval(value: &str) -> Option<u64> {
    let value = value.trim();
    let unit = value.chars().last()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        _ => return None,
    };
    let amount: u64 = value[..value.len() - 1].parse().ok()?;
    if amount == 0 {
        return None;
    }
    amount.checked_mul(multiplier)
}
