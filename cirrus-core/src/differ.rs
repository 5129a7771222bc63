//! Differ - Compare desired configuration with current state
//!
//! Decides whether a resource needs to be created, updated in place,
//! replaced, or left alone, and enforces the immutable-field rule on update.

use std::collections::HashMap;

use crate::provider::{ProviderError, ProviderResult};
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete and create again
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
        forcing_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

/// Compare desired state with current state to compute a Diff
pub fn diff(schema: &ResourceSchema, desired: &Resource, current: &State) -> Diff {
    if !current.exists || current.identifier_or_empty().is_empty() {
        return Diff::Create(desired.clone());
    }

    let changed = changed_attributes(schema, &current.attributes, &desired.attributes);
    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let force_new = schema.force_new_attributes();
    let forcing: Vec<String> = changed
        .iter()
        .filter(|name| force_new.contains(&name.as_str()))
        .cloned()
        .collect();

    if forcing.is_empty() {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
            forcing_attributes: forcing,
        }
    }
}

/// Find changed attributes between stored state and desired configuration.
///
/// A field the caller no longer sets only counts as changed when the remote
/// side does not compute it. Result is sorted.
pub fn changed_attributes(
    schema: &ResourceSchema,
    current: &HashMap<String, Value>,
    desired: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        let is_set = schema
            .attributes
            .get(key)
            .is_some_and(|a| a.attr_type.is_set());
        match current.get(key) {
            Some(current_value) if values_equal(current_value, desired_value, is_set) => {}
            _ => changed.push(key.clone()),
        }
    }

    for key in current.keys() {
        if !desired.contains_key(key)
            && schema.attributes.contains_key(key)
            && !schema.is_computed(key)
        {
            changed.push(key.clone());
        }
    }

    changed.sort();
    changed
}

fn values_equal(a: &Value, b: &Value, unordered: bool) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) if unordered => {
            let count = |list: &[Value], item: &Value| list.iter().filter(|v| *v == item).count();
            x.len() == y.len() && x.iter().all(|item| count(x, item) == count(y, item))
        }
        _ => a == b,
    }
}

/// Reject an update touching any attribute the schema marks immutable
pub fn check_immutable(schema: &ResourceSchema, changed: &[String]) -> ProviderResult<()> {
    for name in schema.immutable_attributes() {
        if changed.iter().any(|c| c == name) {
            return Err(ProviderError::immutable_field(name));
        }
    }
    Ok(())
}
