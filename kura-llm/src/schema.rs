//! Declarative response schemas for structured generation.
//!
//! A [`Schema`] serializes into the upstream's response-schema dialect
//! (`"type": "OBJECT"`, `"properties"`, `"required"`, `"enum"`, `"items"`)
//! and can check a decoded payload against itself, since a model may still
//! return something off-shape.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaType {
    String,
    Number,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(rename = "propertyOrdering", skip_serializing_if = "Vec::is_empty")]
    pub property_ordering: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// First place where a payload departs from its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl Schema {
    fn of(kind: SchemaType) -> Self {
        Self {
            kind,
            enum_values: Vec::new(),
            items: None,
            properties: BTreeMap::new(),
            property_ordering: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_values: values.into_iter().map(Into::into).collect(),
            ..Self::of(SchemaType::String)
        }
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    /// Add a property; declaration order is kept for the upstream.
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        if !self.property_ordering.contains(&name) {
            self.property_ordering.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Check `value` against this schema.
    ///
    /// ```
    /// use kura_llm::schema::Schema;
    /// use serde_json::json;
    ///
    /// let schema = Schema::object()
    ///     .property("mood", Schema::string_enum(["up", "down"]))
    ///     .required(["mood"]);
    ///
    /// assert!(schema.validate(&json!({ "mood": "up" })).is_ok());
    /// let err = schema.validate(&json!({ "mood": "sideways" })).unwrap_err();
    /// assert_eq!(err.path, "$.mood");
    /// ```
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at("$", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), SchemaViolation> {
        let violation = |message: String| SchemaViolation {
            path: path.to_string(),
            message,
        };

        match self.kind {
            SchemaType::String => {
                let s = value
                    .as_str()
                    .ok_or_else(|| violation(format!("expected string, got {}", kind_of(value))))?;
                if !self.enum_values.is_empty() && !self.enum_values.iter().any(|v| v == s) {
                    return Err(violation(format!(
                        "{s:?} is not one of [{}]",
                        self.enum_values.join(", ")
                    )));
                }
            }
            SchemaType::Number => {
                if !value.is_number() {
                    return Err(violation(format!("expected number, got {}", kind_of(value))));
                }
            }
            SchemaType::Array => {
                let items = value
                    .as_array()
                    .ok_or_else(|| violation(format!("expected array, got {}", kind_of(value))))?;
                if let Some(item_schema) = &self.items {
                    for (idx, item) in items.iter().enumerate() {
                        item_schema.validate_at(&format!("{path}[{idx}]"), item)?;
                    }
                }
            }
            SchemaType::Object => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| violation(format!("expected object, got {}", kind_of(value))))?;
                for name in &self.required {
                    if obj.get(name).is_none_or(Value::is_null) {
                        return Err(violation(format!("missing required field `{name}`")));
                    }
                }
                for name in &self.property_ordering {
                    let Some(prop) = self.properties.get(name) else {
                        continue;
                    };
                    match obj.get(name) {
                        Some(field) if !field.is_null() => {
                            prop.validate_at(&format!("{path}.{name}"), field)?;
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
