/// Error types shared by every tree backend.
pub mod error;
/// In-memory tree backend with subscription fan-out.
pub mod memory;
/// Canonical tree paths for rooms, sessions and questions.
pub mod path;
/// Retry policy for writes that must eventually land.
pub mod retry;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::store::{error::StoreResult, path::TreePath};

/// Abstraction over the hierarchical state tree backing all quiz rooms.
///
/// Implementations apply each write atomically, treat a written
/// `Value::Null` like [`StateTree::delete`], and notify every
/// subscription whose path is an ancestor or descendant of the written
/// path. Writing a node replaces its whole subtree.
pub trait StateTree: Send + Sync {
    fn read(&self, path: TreePath) -> BoxFuture<'static, StoreResult<Value>>;
    fn write(&self, path: TreePath, value: Value) -> BoxFuture<'static, StoreResult<()>>;
    fn write_if_absent(&self, path: TreePath, value: Value)
    -> BoxFuture<'static, StoreResult<bool>>;
    fn delete(&self, path: TreePath) -> BoxFuture<'static, StoreResult<()>>;
    fn subscribe(&self, path: TreePath) -> BoxFuture<'static, StoreResult<TreeSubscription>>;
    fn health_check(&self) -> BoxFuture<'static, StoreResult<()>>;
}

/// Live feed of the value under one tree path.
///
/// The first [`recv`](TreeSubscription::recv) yields the value as it
/// was at subscription time (possibly `Null`); each later one yields a
/// fresh snapshot taken after a write touched the subscribed path.
#[derive(Debug)]
pub struct TreeSubscription {
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl TreeSubscription {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Value>) -> Self {
        TreeSubscription { receiver }
    }

    /// Next snapshot, or `None` once the backing tree is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }
}

/// Decode the children of a tree node into typed values, keyed by
/// segment name. Malformed children are logged and skipped rather than
/// failing the whole snapshot.
pub fn decode_children<T: DeserializeOwned>(value: &Value) -> IndexMap<String, T> {
    let Some(entries) = value.as_object() else {
        return IndexMap::new();
    };

    let mut decoded = IndexMap::with_capacity(entries.len());
    for (key, child) in entries {
        match serde_json::from_value::<T>(child.clone()) {
            Ok(typed) => {
                decoded.insert(key.clone(), typed);
            }
            Err(error) => {
                warn!(key = %key, error = %error, "skipping malformed tree node");
            }
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        label: String,
    }

    #[test]
    fn decode_children_skips_malformed_nodes() {
        let value = json!({
            "a": { "label": "first" },
            "b": { "label": 42 },
            "c": { "label": "third" },
        });

        let rows = decode_children::<Row>(&value);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows["a"].label, "first");
        assert_eq!(rows["c"].label, "third");
    }

    #[test]
    fn decode_children_of_scalar_is_empty() {
        assert!(decode_children::<Row>(&json!(7)).is_empty());
        assert!(decode_children::<Row>(&Value::Null).is_empty());
    }
}
