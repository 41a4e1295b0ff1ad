// Response wrapping: entities, lists, and field mappings

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A response body shaped for one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Entity(Value);

impl Entity {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value of the primary key field, if present
    pub fn primary_key(&self, pk: &str) -> Option<&Value> {
        self.get(pk).filter(|v| !v.is_null())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

pub type EntityList = Vec<Entity>;

/// Computes a field from its current value and the whole record
#[derive(Clone)]
pub struct FieldTransform(Arc<dyn Fn(Option<&Value>, &Map<String, Value>) -> Value + Send + Sync>);

impl FieldTransform {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(Option<&Value>, &Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }
}

impl fmt::Debug for FieldTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldTransform(..)")
    }
}

/// How one field of a response is mapped onto the entity
#[derive(Debug, Clone)]
pub enum FieldMapping {
    /// Shape a nested object as a single related entity
    Entity(Arc<EntityShape>),
    /// Shape a nested array as a list of related entities
    Collection(Arc<EntityShape>),
    Transform(FieldTransform),
    /// Move the value found under `source_key` to this field
    Rename { source_key: String },
}

/// Defaults and field mappings applied to every wrapped entity
#[derive(Debug, Clone, Default)]
pub struct EntityShape {
    defaults: Map<String, Value>,
    mappings: Vec<(String, FieldMapping)>,
}

impl EntityShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_default(mut self, key: &str, value: Value) -> Self {
        self.defaults.insert(key.to_string(), value);
        self
    }

    pub fn with_mapping(mut self, key: &str, mapping: FieldMapping) -> Self {
        self.mappings.push((key.to_string(), mapping));
        self
    }

    /// Apply defaults for absent fields, then mappings in declaration order.
    /// Non-object values pass through unchanged.
    pub fn shape(&self, value: Value) -> Value {
        let mut record = match value {
            Value::Object(record) => record,
            other => return other,
        };

        for (key, default) in &self.defaults {
            if !record.contains_key(key) {
                record.insert(key.clone(), default.clone());
            }
        }

        for (key, mapping) in &self.mappings {
            match mapping {
                FieldMapping::Entity(shape) => {
                    if let Some(field) = record.get_mut(key) {
                        *field = shape.shape(field.take());
                    }
                }
                FieldMapping::Collection(shape) => {
                    if let Some(field) = record.get_mut(key) {
                        let items = shape
                            .list(field.take())
                            .into_iter()
                            .map(Entity::into_value)
                            .collect();
                        *field = Value::Array(items);
                    }
                }
                FieldMapping::Transform(transform) => {
                    let computed = (transform.0)(record.get(key), &record);
                    record.insert(key.clone(), computed);
                }
                FieldMapping::Rename { source_key } => {
                    if let Some(moved) = record.shift_remove(source_key) {
                        record.insert(key.clone(), moved);
                    }
                }
            }
        }

        Value::Object(record)
    }

    pub fn entity(&self, value: Value) -> Entity {
        Entity(self.shape(value))
    }

    /// Arrays wrap element-wise with nulls dropped; `null` is an empty list
    /// and any other value becomes a one-element list.
    pub fn list(&self, value: Value) -> EntityList {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(|item| self.entity(item))
                .collect(),
            Value::Null => Vec::new(),
            other => vec![self.entity(other)],
        }
    }
}
