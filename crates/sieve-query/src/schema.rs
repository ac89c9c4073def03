//! Queryable field schema.
//!
//! A [`FieldSchema`] is the ordered set of fields a query may reference. It is
//! built once at startup, from an explicit descriptor list, a representative
//! record, or a type's JSON schema, and is immutable afterwards.

use crate::error::ConfigurationError;
use crate::render::is_safe_identifier;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Annotation that overrides implicit-search eligibility in a JSON schema
pub const IMPLICIT_ANNOTATION: &str = "x-sieve-implicit";

/// Annotation that marks a field as structured (nested-access capable)
pub const NESTED_ANNOTATION: &str = "x-sieve-nested";

/// Structural kind of a stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Timestamp,
    /// JSON/blob column, addressable as `field.sub`
    Structured,
    List,
    Unknown,
}

impl FieldKind {
    /// Whether `field.sub` access is allowed
    pub fn supports_nested(self) -> bool {
        matches!(self, Self::Structured)
    }

    /// Plain textual fields take part in unfielded search unless overridden
    pub fn implicit_by_default(self) -> bool {
        matches!(self, Self::Text)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Structured => "structured",
            Self::List => "list",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One queryable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldSpec")]
pub struct FieldDescriptor {
    /// External (serialized) name
    pub name: String,
    pub kind: FieldKind,
    /// Eligible for unfielded expansion
    pub implicit: bool,
}

impl FieldDescriptor {
    /// Descriptor with implicit eligibility derived from the kind
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            implicit: kind.implicit_by_default(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn structured(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Structured)
    }

    pub fn with_implicit(mut self, implicit: bool) -> Self {
        self.implicit = implicit;
        self
    }

    pub fn supports_nested(&self) -> bool {
        self.kind.supports_nested()
    }
}

/// Configuration-file shape of a descriptor: `implicit` and `nested` are optional.
#[derive(Deserialize)]
struct FieldSpec {
    name: String,
    #[serde(default = "unknown_kind")]
    kind: FieldKind,
    #[serde(default)]
    implicit: Option<bool>,
    #[serde(default)]
    nested: bool,
}

fn unknown_kind() -> FieldKind {
    FieldKind::Unknown
}

impl From<FieldSpec> for FieldDescriptor {
    fn from(spec: FieldSpec) -> Self {
        let kind = if spec.nested {
            FieldKind::Structured
        } else {
            spec.kind
        };
        let implicit = spec.implicit.unwrap_or(kind.implicit_by_default());
        Self {
            name: spec.name,
            kind,
            implicit,
        }
    }
}

/// Ordered set of uniquely named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl FieldSchema {
    /// Build a schema from explicit descriptors (declaration order is kept).
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, ConfigurationError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(ConfigurationError::EmptyFieldName);
            }
            if !is_safe_identifier(&field.name) {
                return Err(ConfigurationError::InvalidFieldName(field.name.clone()));
            }
            if let Some(&existing) = index.get(&field.name) {
                return Err(ConfigurationError::DuplicateField {
                    name: field.name.clone(),
                    first: fields[existing].kind,
                    second: field.kind,
                });
            }
            index.insert(field.name.clone(), position);
        }
        Ok(Self { fields, index })
    }

    pub fn builder() -> FieldSchemaBuilder {
        FieldSchemaBuilder::default()
    }

    /// Infer fields from a representative record object.
    pub fn from_record(record: &Value) -> Result<Self, ConfigurationError> {
        FieldSchemaBuilder::from_record(record)?.build()
    }

    /// Infer fields from a sample value of a serializable record type.
    pub fn from_sample<T: Serialize>(sample: &T) -> Result<Self, ConfigurationError> {
        FieldSchemaBuilder::from_sample(sample)?.build()
    }

    /// Infer fields from the JSON schema of `T`.
    pub fn from_json_schema<T: JsonSchema>() -> Result<Self, ConfigurationError> {
        FieldSchemaBuilder::from_json_schema::<T>()?.build()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields eligible for unfielded expansion, in declaration order
    pub fn implicit_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.implicit)
    }

    /// Fallback field for unqualified terms: first implicit, else first declared
    pub fn default_field(&self) -> Option<&str> {
        self.implicit_fields()
            .next()
            .or_else(|| self.fields.first())
            .map(|f| f.name.as_str())
    }

    /// Names shown to users when a reference is rejected
    pub fn valid_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| {
                if f.supports_nested() {
                    format!("{}.*", f.name)
                } else {
                    f.name.clone()
                }
            })
            .collect()
    }
}

/// Collects descriptors from one source and applies per-field overrides.
#[derive(Debug, Clone, Default)]
pub struct FieldSchemaBuilder {
    fields: Vec<FieldDescriptor>,
    implicit_overrides: Vec<(String, bool)>,
    nested_overrides: Vec<String>,
}

impl FieldSchemaBuilder {
    pub fn from_record(record: &Value) -> Result<Self, ConfigurationError> {
        let object = record.as_object().ok_or_else(|| {
            ConfigurationError::Extraction("representative record must be an object".to_string())
        })?;
        let fields = object
            .iter()
            .map(|(name, value)| FieldDescriptor::new(name.clone(), kind_of_value(value)))
            .collect();
        Ok(Self {
            fields,
            ..Self::default()
        })
    }

    pub fn from_sample<T: Serialize>(sample: &T) -> Result<Self, ConfigurationError> {
        let value = serde_json::to_value(sample)
            .map_err(|e| ConfigurationError::Extraction(e.to_string()))?;
        Self::from_record(&value)
    }

    pub fn from_json_schema<T: JsonSchema>() -> Result<Self, ConfigurationError> {
        let schema = schemars::schema_for!(T);
        let root = serde_json::to_value(&schema)
            .map_err(|e| ConfigurationError::Extraction(e.to_string()))?;
        let empty = Map::new();
        let defs = root
            .get("$defs")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let properties = root
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ConfigurationError::Extraction(format!(
                    "type '{}' does not serialize as an object",
                    T::schema_name()
                ))
            })?;

        let mut fields = Vec::with_capacity(properties.len());
        for (name, property) in properties {
            let nested = annotation(property, NESTED_ANNOTATION).unwrap_or(false);
            let kind = if nested {
                FieldKind::Structured
            } else {
                kind_of_schema(property, defs, 0)
            };
            let mut field = FieldDescriptor::new(name.clone(), kind);
            if let Some(implicit) = annotation(property, IMPLICIT_ANNOTATION) {
                field.implicit = implicit;
            }
            fields.push(field);
        }
        Ok(Self {
            fields,
            ..Self::default()
        })
    }

    /// Append an explicit descriptor
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Override implicit-search eligibility for `name`
    pub fn implicit(mut self, name: impl Into<String>, implicit: bool) -> Self {
        self.implicit_overrides.push((name.into(), implicit));
        self
    }

    /// Mark `name` as backed by structured storage
    pub fn nested(mut self, name: impl Into<String>) -> Self {
        self.nested_overrides.push(name.into());
        self
    }

    pub fn build(self) -> Result<FieldSchema, ConfigurationError> {
        let mut fields = self.fields;
        for name in self.nested_overrides {
            let field = find_mut(&mut fields, &name)?;
            field.kind = FieldKind::Structured;
        }
        for (name, implicit) in self.implicit_overrides {
            find_mut(&mut fields, &name)?.implicit = implicit;
        }
        FieldSchema::new(fields)
    }
}

fn find_mut<'a>(
    fields: &'a mut [FieldDescriptor],
    name: &str,
) -> Result<&'a mut FieldDescriptor, ConfigurationError> {
    fields
        .iter_mut()
        .find(|f| f.name == name)
        .ok_or_else(|| ConfigurationError::UnknownField(name.to_string()))
}

fn kind_of_value(value: &Value) -> FieldKind {
    match value {
        Value::String(_) => FieldKind::Text,
        Value::Number(_) => FieldKind::Number,
        Value::Bool(_) => FieldKind::Boolean,
        Value::Object(_) => FieldKind::Structured,
        Value::Array(_) => FieldKind::List,
        Value::Null => FieldKind::Unknown,
    }
}

fn annotation(property: &Value, key: &str) -> Option<bool> {
    property.get(key).and_then(Value::as_bool)
}

/// Resolve a property schema to a kind, following `$ref` and nullable unions.
fn kind_of_schema(schema: &Value, defs: &Map<String, Value>, depth: usize) -> FieldKind {
    // Guard against self-referential definitions
    if depth > 8 {
        return FieldKind::Unknown;
    }

    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        return reference
            .rsplit('/')
            .next()
            .and_then(|name| defs.get(name))
            .map_or(FieldKind::Unknown, |def| kind_of_schema(def, defs, depth + 1));
    }

    let type_name = match schema.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    };

    match type_name {
        Some("string") => match schema.get("format").and_then(Value::as_str) {
            Some("date-time") | Some("date") => FieldKind::Timestamp,
            _ => FieldKind::Text,
        },
        Some("integer") | Some("number") => FieldKind::Number,
        Some("boolean") => FieldKind::Boolean,
        Some("object") => FieldKind::Structured,
        Some("array") => FieldKind::List,
        _ => {
            for key in ["anyOf", "oneOf"] {
                if let Some(options) = schema.get(key).and_then(Value::as_array) {
                    let kind = options
                        .iter()
                        .filter(|o| o.get("type").and_then(Value::as_str) != Some("null"))
                        .map(|o| kind_of_schema(o, defs, depth + 1))
                        .next();
                    if let Some(kind) = kind {
                        return kind;
                    }
                }
            }
            if schema.get("enum").is_some() || schema.get("const").is_some() {
                FieldKind::Text
            } else {
                FieldKind::Unknown
            }
        }
    }
}
