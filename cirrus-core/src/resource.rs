//! Resource - Representing resources and their state

use std::collections::HashMap;

use crate::provider::{ProviderError, ProviderResult};

/// Flat-to-nested attribute map shared by desired configuration and state
pub type Attributes = HashMap<String, Value>;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "tsf_task", "tse_cngw_service")
    pub resource_type: String,
    /// Resource name (the address the caller knows this resource by)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    /// Convert a JSON value returned by the remote API into an attribute value.
    ///
    /// `null` has no attribute representation and yields `None`, which is how
    /// absent remote fields stay absent in local state.
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::Array(arr) => {
                Some(Value::List(arr.iter().filter_map(Value::from_json).collect()))
            }
            serde_json::Value::Object(obj) => {
                let map = obj
                    .iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect();
                Some(Value::Map(map))
            }
        }
    }

    /// Convert an attribute value to JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Wrap a single map in a one-element list, the shape of a nested block
    pub fn block(map: HashMap<String, Value>) -> Value {
        Value::List(vec![Value::Map(map)])
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        // Out of Int range: keep the magnitude rather than wrapping negative
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::String).collect())
    }
}

/// Insert `value` under `key` only when it is present.
///
/// Remote responses leave unset fields out; they must not overwrite local state.
pub fn set_present<V: Into<Value>>(attrs: &mut Attributes, key: &str, value: Option<V>) {
    if let Some(v) = value {
        attrs.insert(key.to_string(), v.into());
    }
}

/// Typed, read-only view over an attribute map
#[derive(Debug, Clone, Copy)]
pub struct AttributeReader<'a> {
    attributes: &'a HashMap<String, Value>,
}

impl<'a> AttributeReader<'a> {
    pub fn new(attributes: &'a HashMap<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn string(&self, key: &str) -> ProviderResult<Option<String>> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(key, "string", other)),
        }
    }

    pub fn required_string(&self, key: &str) -> ProviderResult<String> {
        self.string(key)?.ok_or_else(|| missing(key))
    }

    pub fn int(&self, key: &str) -> ProviderResult<Option<i64>> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(mismatch(key, "int", other)),
        }
    }

    pub fn required_int(&self, key: &str) -> ProviderResult<i64> {
        self.int(key)?.ok_or_else(|| missing(key))
    }

    pub fn bool(&self, key: &str) -> ProviderResult<Option<bool>> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(key, "bool", other)),
        }
    }

    /// List (or set) of strings; absent reads as empty
    pub fn strings(&self, key: &str) -> ProviderResult<Vec<String>> {
        match self.attributes.get(key) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(mismatch(key, "list of strings", other)),
                })
                .collect(),
            Some(other) => Err(mismatch(key, "list", other)),
        }
    }

    /// All entries of a nested block list
    pub fn blocks(&self, key: &str) -> ProviderResult<Vec<AttributeReader<'a>>> {
        match self.attributes.get(key) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Map(map) => Ok(AttributeReader::new(map)),
                    other => Err(mismatch(key, "block", other)),
                })
                .collect(),
            Some(other) => Err(mismatch(key, "list of blocks", other)),
        }
    }

    /// First entry of a single-element nested block
    pub fn block(&self, key: &str) -> ProviderResult<Option<AttributeReader<'a>>> {
        Ok(self.blocks(key)?.into_iter().next())
    }
}

fn missing(key: &str) -> ProviderError {
    ProviderError::validation(format!("Required attribute '{}' is missing", key))
}

fn mismatch(key: &str, expected: &str, got: &Value) -> ProviderError {
    ProviderError::validation(format!(
        "Attribute '{}' must be {}, got {:?}",
        key, expected, got
    ))
}

/// Desired state declared by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    /// If true, this is a data source (read-only) that won't be modified
    pub read_only: bool,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            read_only: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }

    pub fn reader(&self) -> AttributeReader<'_> {
        AttributeReader::new(&self.attributes)
    }
}

/// Local state: last applied configuration plus last observed remote values
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Provider-assigned identifier, possibly composite (e.g., "gateway-1#svc")
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// The stored identifier, `""` once the remote object is gone
    pub fn identifier_or_empty(&self) -> &str {
        self.identifier.as_deref().unwrap_or("")
    }

    /// Mark the remote object as gone so the caller plans a recreate
    pub fn clear_identifier(&mut self) {
        self.identifier = None;
        self.exists = false;
    }

    /// Copy every remote field into local state.
    ///
    /// Fields missing from `remote` are left as they are. Returns the names
    /// whose value changed.
    pub fn merge_remote(&mut self, remote: Attributes) -> Vec<String> {
        let mut updated = Vec::new();
        for (key, value) in remote {
            if self.attributes.get(&key) != Some(&value) {
                updated.push(key.clone());
            }
            self.attributes.insert(key, value);
        }
        updated.sort();
        self.exists = true;
        updated
    }

    pub fn reader(&self) -> AttributeReader<'_> {
        AttributeReader::new(&self.attributes)
    }
}
