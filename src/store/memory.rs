//! In-memory implementation of the state tree.
//!
//! The whole tree is one `serde_json::Value` guarded by a mutex.
//! Watchers are registered alongside it so that every write can fan
//! out fresh snapshots to overlapping subscriptions before the lock is
//! released, keeping notification order identical to write order.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, mpsc};

use crate::store::{
    StateTree, TreeSubscription,
    error::StoreResult,
    path::TreePath,
};

/// State tree held entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryTree {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    state: Mutex<MemoryState>,
}

struct MemoryState {
    root: Value,
    watchers: Vec<Watcher>,
}

struct Watcher {
    path: TreePath,
    sender: mpsc::UnboundedSender<Value>,
}

impl Default for MemoryState {
    fn default() -> Self {
        MemoryState {
            root: Value::Null,
            watchers: Vec::new(),
        }
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        MemoryTree::default()
    }
}

impl StateTree for MemoryTree {
    fn read(&self, path: TreePath) -> BoxFuture<'static, StoreResult<Value>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let state = inner.state.lock().await;
            Ok(node_at(&state.root, path.segments())
                .cloned()
                .unwrap_or(Value::Null))
        })
    }

    fn write(&self, path: TreePath, value: Value) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.state.lock().await;
            apply_write(&mut state, &path, value);
            Ok(())
        })
    }

    fn write_if_absent(
        &self,
        path: TreePath,
        value: Value,
    ) -> BoxFuture<'static, StoreResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.state.lock().await;
            let occupied = node_at(&state.root, path.segments()).is_some_and(|node| !node.is_null());
            if occupied {
                return Ok(false);
            }
            apply_write(&mut state, &path, value);
            Ok(true)
        })
    }

    fn delete(&self, path: TreePath) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.state.lock().await;
            apply_write(&mut state, &path, Value::Null);
            Ok(())
        })
    }

    fn subscribe(&self, path: TreePath) -> BoxFuture<'static, StoreResult<TreeSubscription>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.state.lock().await;
            let (sender, receiver) = mpsc::unbounded_channel();

            // Seed the subscription with the value as of right now so
            // late subscribers do not have to wait for the next write.
            let snapshot = node_at(&state.root, path.segments())
                .cloned()
                .unwrap_or(Value::Null);
            let _ = sender.send(snapshot);

            state.watchers.push(Watcher { path, sender });
            Ok(TreeSubscription::new(receiver))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

fn apply_write(state: &mut MemoryState, path: &TreePath, value: Value) {
    if value.is_null() {
        remove_node(&mut state.root, path.segments());
    } else {
        set_node(&mut state.root, path.segments(), value);
    }
    notify(state, path);
}

/// Replace the node at `segments` with `value`, materializing missing
/// ancestors as objects. A scalar sitting where an ancestor is needed
/// gets overwritten, matching replace-subtree semantics.
fn set_node(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !matches!(node, Value::Object(_)) {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(entries) = node {
        let child = entries.entry(head.clone()).or_insert(Value::Null);
        set_node(child, rest, value);
    }
}

/// Remove the node at `segments`, pruning ancestors that end up empty.
/// An empty object and a missing node are indistinguishable to readers.
fn remove_node(node: &mut Value, segments: &[String]) {
    let Some((head, rest)) = segments.split_first() else {
        *node = Value::Null;
        return;
    };

    let Value::Object(entries) = node else {
        return;
    };
    let Some(child) = entries.get_mut(head) else {
        return;
    };
    remove_node(child, rest);
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        entries.remove(head);
    }
}

fn node_at<'tree>(node: &'tree Value, segments: &[String]) -> Option<&'tree Value> {
    segments
        .iter()
        .try_fold(node, |current, segment| current.get(segment))
}

/// Push fresh snapshots to every watcher whose path is an ancestor or
/// descendant of the written path. Watchers whose receiver is gone are
/// dropped on the way.
fn notify(state: &mut MemoryState, written: &TreePath) {
    let MemoryState { root, watchers } = state;
    watchers.retain(|watcher| {
        if !watcher.path.overlaps(written) {
            return !watcher.sender.is_closed();
        }
        let snapshot = node_at(root, watcher.path.segments())
            .cloned()
            .unwrap_or(Value::Null);
        watcher.sender.send(snapshot).is_ok()
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn missing_paths_read_as_null() {
        let tree = MemoryTree::new();
        let value = tree.read(TreePath::new("rooms/nope")).await.unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn child_writes_merge_into_their_parent() {
        let tree = MemoryTree::new();
        let room = TreePath::new("rooms/abc");

        tree.write(room.child("status"), json!("open")).await.unwrap();
        tree.write(room.child("createdAt"), json!(17)).await.unwrap();

        let value = tree.read(room).await.unwrap();
        assert_eq!(value, json!({ "status": "open", "createdAt": 17 }));
    }

    #[tokio::test]
    async fn writing_a_node_replaces_its_whole_subtree() {
        let tree = MemoryTree::new();
        let state = TreePath::new("rooms/abc/quizState");

        tree.write(
            state.clone(),
            json!({ "phase": "active", "answers": { "p1": { "q1": { "answer": "A" } } } }),
        )
        .await
        .unwrap();
        tree.write(state.clone(), json!({ "phase": "idle" }))
            .await
            .unwrap();

        let value = tree.read(state).await.unwrap();
        assert_eq!(value, json!({ "phase": "idle" }));
    }

    #[tokio::test]
    async fn write_if_absent_keeps_the_first_value() {
        let tree = MemoryTree::new();
        let path = TreePath::new("rooms/abc/quizState/answers/p1/q1");

        let first = tree
            .write_if_absent(path.clone(), json!({ "answer": "A" }))
            .await
            .unwrap();
        let second = tree
            .write_if_absent(path.clone(), json!({ "answer": "B" }))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let value = tree.read(path).await.unwrap();
        assert_eq!(value, json!({ "answer": "A" }));
    }

    #[tokio::test]
    async fn delete_prunes_empty_ancestors() {
        let tree = MemoryTree::new();
        let entry = TreePath::new("rooms/abc/participants/p1");

        tree.write(entry.clone(), json!({ "name": "Ada" }))
            .await
            .unwrap();
        tree.delete(entry).await.unwrap();

        let participants = tree
            .read(TreePath::new("rooms/abc/participants"))
            .await
            .unwrap();
        assert!(participants.is_null());
    }

    #[tokio::test]
    async fn null_write_behaves_like_delete() {
        let tree = MemoryTree::new();
        let path = TreePath::new("rooms/abc/status");

        tree.write(path.clone(), json!("open")).await.unwrap();
        tree.write(path.clone(), Value::Null).await.unwrap();

        assert!(tree.read(path).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn subscription_sees_current_value_then_changes() {
        let tree = MemoryTree::new();
        let path = TreePath::new("rooms/abc/quizState/timer");
        tree.write(path.clone(), json!(10)).await.unwrap();

        let mut subscription = tree.subscribe(path.clone()).await.unwrap();
        assert_eq!(subscription.recv().await, Some(json!(10)));

        tree.write(path, json!(9)).await.unwrap();
        assert_eq!(subscription.recv().await, Some(json!(9)));
    }

    #[tokio::test]
    async fn descendant_write_notifies_ancestor_subscriber() {
        let tree = MemoryTree::new();
        let room = TreePath::new("rooms/abc");

        let mut subscription = tree.subscribe(room.clone()).await.unwrap();
        assert_eq!(subscription.recv().await, Some(Value::Null));

        tree.write(room.child("status"), json!("open")).await.unwrap();
        assert_eq!(
            subscription.recv().await,
            Some(json!({ "status": "open" }))
        );
    }

    #[tokio::test]
    async fn ancestor_write_notifies_descendant_subscriber() {
        let tree = MemoryTree::new();
        let room = TreePath::new("rooms/abc");

        let mut subscription = tree.subscribe(room.child("status")).await.unwrap();
        assert_eq!(subscription.recv().await, Some(Value::Null));

        tree.write(room, json!({ "status": "finished", "createdAt": 3 }))
            .await
            .unwrap();
        assert_eq!(subscription.recv().await, Some(json!("finished")));
    }

    #[tokio::test]
    async fn sibling_writes_do_not_notify() {
        let tree = MemoryTree::new();

        let mut subscription = tree
            .subscribe(TreePath::new("rooms/abc/scores"))
            .await
            .unwrap();
        assert_eq!(subscription.recv().await, Some(Value::Null));

        tree.write(TreePath::new("rooms/abc/participants/p1"), json!({ "name": "Ada" }))
            .await
            .unwrap();
        tree.write(TreePath::new("rooms/abc/scores/p1"), json!({ "total": 0 }))
            .await
            .unwrap();

        // Only the scores write shows up.
        assert_eq!(
            subscription.recv().await,
            Some(json!({ "p1": { "total": 0 } }))
        );
    }
}
