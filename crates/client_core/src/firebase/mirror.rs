//! Local copy of the streamed collection, kept current by `put`/`patch`
//! events.

use serde_json::{Map, Value};
use shared::domain::{ItemId, ItemRecord, Snapshot};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CollectionMirror {
    root: Value,
}

impl CollectionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the node at `path` (relative to the collection). `null`
    /// removes it.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = split_path(path);
        set_at(&mut self.root, &segments, data);
    }

    /// Merges each child of `data` into the node at `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            warn!(path, "ignoring non-object patch payload");
            return;
        };
        let base = split_path(path);
        for (key, value) in children {
            let mut segments = base.clone();
            segments.extend(split_path(&key));
            set_at(&mut self.root, &segments, value);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let children = match &self.root {
            Value::Object(children) => children,
            Value::Null => return Snapshot::empty(),
            other => {
                warn!("collection root is not an object: {other}");
                return Snapshot::empty();
            }
        };

        children
            .iter()
            .filter_map(|(key, value)| {
                match serde_json::from_value::<ItemRecord>(value.clone()) {
                    Ok(record) => Some((ItemId::new(key.clone()), record)),
                    Err(err) => {
                        warn!(key, "skipping malformed record: {err}");
                        None
                    }
                }
            })
            .collect()
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn set_at(node: &mut Value, segments: &[&str], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(children) = node {
        let child = children.entry(head.to_string()).or_insert(Value::Null);
        set_at(child, rest, data);
        if is_empty_node(child) {
            children.remove(*head);
        }
    }
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(children) => children.is_empty(),
        _ => false,
    }
}
