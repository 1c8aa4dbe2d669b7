//! Tree positions and subtree operations.

use std::fmt;

use hivekit_engine::{EngineError, HiveEngine, NodeHandle};
use tracing::{debug, error, warn};

use crate::error::{engine_failure, HiveError, Result};
use crate::hive::Hive;
use crate::path::{self, DELIMITER};

/// Whether a [`Node`] refers to a live position in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeState {
    Existent(NodeHandle),
    Absent,
}

/// One position in a hive's tree.
///
/// A node borrows the [`Hive`] it came from and cannot outlive it. Failed
/// lookups return an absent node rather than an error; every operation on
/// an absent node is well defined (see the individual methods). The cached
/// path is for diagnostics only and is not re-read from the engine.
pub struct Node<'h, E: HiveEngine> {
    hive: &'h Hive<E>,
    state: NodeState,
    path: String,
}

impl<'h, E: HiveEngine> Node<'h, E> {
    pub(crate) fn existent(hive: &'h Hive<E>, handle: NodeHandle, path: String) -> Self {
        Self {
            hive,
            state: NodeState::Existent(handle),
            path,
        }
    }

    pub(crate) fn absent(hive: &'h Hive<E>, path: String) -> Self {
        Self {
            hive,
            state: NodeState::Absent,
            path,
        }
    }

    pub(crate) fn hive(&self) -> &'h Hive<E> {
        self.hive
    }

    /// `true` if the node refers to a live position in the tree.
    pub fn exists(&self) -> bool {
        self.handle().is_some()
    }

    /// Existence state and engine handle.
    pub fn state(&self) -> NodeState {
        match self.handle() {
            Some(handle) => NodeState::Existent(handle),
            None => NodeState::Absent,
        }
    }

    /// Engine handle, `None` for an absent node.
    ///
    /// A node whose subtree was deleted through another handle is absent
    /// from then on.
    pub fn handle(&self) -> Option<NodeHandle> {
        match self.state {
            NodeState::Existent(handle) if self.hive.engine().contains(handle) => Some(handle),
            NodeState::Existent(handle) => {
                debug!(path = %self.path, %handle, "node was deleted");
                None
            }
            NodeState::Absent => None,
        }
    }

    /// Display path from the hive root, starting with the hive name.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last segment of the display path.
    pub fn name(&self) -> &str {
        self.path.rsplit(DELIMITER).next().unwrap_or_default()
    }

    /// Look up the node at `path` below this one without creating anything.
    ///
    /// A missing segment anywhere along the way yields an absent node.
    pub fn get_subnode(&self, path: &str) -> Result<Self> {
        path::resolve(self, path, false)
    }

    /// Look up the node at `path`, creating each missing segment.
    pub fn get_or_create_subnode(&self, path: &str) -> Result<Self> {
        if !self.exists() {
            warn!(parent = %self.path, %path, "cannot create under missing node");
        }
        path::resolve(self, path, true)
    }

    /// Alias for [`Node::get_or_create_subnode`].
    pub fn create_subnode(&self, path: &str) -> Result<Self> {
        self.get_or_create_subnode(path)
    }

    /// Direct children in engine order.
    ///
    /// An absent node has no children.
    pub fn children(&self) -> Result<Vec<Self>> {
        debug!(path = %self.path, "listing children");
        let Some(handle) = self.handle() else {
            warn!(path = %self.path, "children of missing node");
            return Ok(Vec::new());
        };

        let engine = self.hive.engine();
        let handles = engine
            .children(handle)
            .map_err(|e| engine_failure(format!("list children of {}", self.path), e))?;

        let children = handles
            .into_iter()
            .map(|child| {
                let name = engine
                    .node_name(child)
                    .map_err(|e| engine_failure(format!("name child of {}", self.path), e))?;
                Ok(Self::existent(self.hive, child, path::join(&self.path, &name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(children)
    }

    /// Delete the subtree at `path` below this node.
    ///
    /// Succeeds without doing anything when the target (or this node) does
    /// not exist.
    pub fn delete_subnode(&self, path: &str) -> Result<()> {
        if !self.exists() {
            warn!(parent = %self.path, %path, "delete under missing node");
            return Ok(());
        }

        let target = self.get_subnode(path)?;
        let Some(handle) = target.handle() else {
            debug!(path = %target.path, "nothing to delete");
            return Ok(());
        };

        self.hive
            .engine_mut()
            .delete_child(handle)
            .map_err(|e| delete_failure(&target.path, e))?;
        debug!(path = %target.path, "subnode deleted");
        Ok(())
    }

    /// Delete this node and its whole subtree.
    ///
    /// Fails with [`HiveError::NotFound`] if the node does not exist and with
    /// [`HiveError::Unsupported`] for the root.
    pub fn delete(self) -> Result<()> {
        let Some(handle) = self.handle() else {
            warn!(path = %self.path, "delete of missing node");
            return Err(HiveError::not_found(self.path));
        };

        self.hive
            .engine_mut()
            .delete_child(handle)
            .map_err(|e| delete_failure(&self.path, e))?;
        debug!(path = %self.path, "node deleted");
        Ok(())
    }
}

fn delete_failure(path: &str, source: EngineError) -> HiveError {
    match source {
        EngineError::CannotDeleteRoot => {
            error!(%path, "refusing to delete the root node");
            HiveError::Unsupported(format!("cannot delete the root node {path}"))
        }
        source => engine_failure(format!("delete {path}"), source),
    }
}

impl<E: HiveEngine> Clone for Node<'_, E> {
    fn clone(&self) -> Self {
        Self {
            hive: self.hive,
            state: self.state,
            path: self.path.clone(),
        }
    }
}

impl<E: HiveEngine> PartialEq for Node<'_, E> {
    /// Two nodes are equal when they come from the same hive and have the
    /// same state; the cached paths are ignored.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.hive, other.hive) && self.state == other.state
    }
}

impl<E: HiveEngine> fmt::Debug for Node<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivekit_engine::FileHive;

    fn hive() -> Hive<FileHive> {
        Hive::from_engine(FileHive::in_memory(), "TEST")
    }

    fn child_names(node: &Node<'_, FileHive>) -> Vec<String> {
        node.children()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn empty_path_is_the_start_node() {
        let hive = hive();
        let root = hive.root();
        assert_eq!(root.get_subnode("").unwrap(), root);
        assert_eq!(root.get_or_create_subnode("\\").unwrap(), root);
    }

    #[test]
    fn create_builds_every_segment() {
        let hive = hive();
        let root = hive.root();
        let b = root.get_or_create_subnode("A\\B").unwrap();
        assert!(b.exists());
        assert_eq!(b.path(), "TEST\\A\\B");
        assert_eq!(b.name(), "B");

        let a = root.get_subnode("A").unwrap();
        assert_eq!(child_names(&a), vec!["B"]);
        assert_eq!(a.get_subnode("B").unwrap(), b);
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let hive = hive();
        let root = hive.root();
        let first = root.get_or_create_subnode("A\\B").unwrap();
        let second = root.get_or_create_subnode("A\\B").unwrap();
        assert_eq!(first.handle(), second.handle());
        assert_eq!(child_names(&root), vec!["A"]);
    }

    #[test]
    fn missing_intermediate_yields_absent() {
        let hive = hive();
        let root = hive.root();
        root.get_or_create_subnode("A\\B").unwrap();

        let missing = root.get_subnode("X\\B").unwrap();
        assert!(!missing.exists());
        assert_eq!(missing.state(), NodeState::Absent);
        assert_eq!(missing.path(), "TEST\\X\\B");
    }

    #[test]
    fn lookup_never_mutates() {
        let hive = hive();
        let root = hive.root();
        root.get_or_create_subnode("A").unwrap();
        let before = root.children().unwrap().len();

        assert!(!root.get_subnode("Nope\\Deeper").unwrap().exists());
        assert!(!root.get_subnode("A\\Nope").unwrap().exists());
        assert_eq!(root.children().unwrap().len(), before);
        assert!(child_names(&root.get_subnode("A").unwrap()).is_empty());
    }

    #[test]
    fn lookup_is_case_sensitive_for_nodes() {
        let hive = hive();
        let root = hive.root();
        root.get_or_create_subnode("Software").unwrap();
        assert!(!root.get_subnode("software").unwrap().exists());
    }

    #[test]
    fn doubled_delimiters_are_skipped() {
        let hive = hive();
        let root = hive.root();
        let b = root.get_or_create_subnode("\\A\\\\B\\").unwrap();
        assert_eq!(root.get_subnode("A\\B").unwrap(), b);
        assert_eq!(child_names(&root), vec!["A"]);
    }

    #[test]
    fn absent_start_stays_absent() {
        let hive = hive();
        let root = hive.root();
        let missing = root.get_subnode("Missing").unwrap();

        assert!(!missing.get_subnode("").unwrap().exists());
        let created = missing.get_or_create_subnode("Child").unwrap();
        assert!(!created.exists());
        assert!(child_names(&root).is_empty());
    }

    // -----------------------------------------------------------------------
    // Children
    // -----------------------------------------------------------------------

    #[test]
    fn children_in_creation_order_with_paths() {
        let hive = hive();
        let root = hive.root();
        for name in ["Zeta", "Alpha", "Mid"] {
            root.get_or_create_subnode(name).unwrap();
        }
        let children = root.children().unwrap();
        let paths: Vec<_> = children.iter().map(|c| c.path().to_string()).collect();
        assert_eq!(paths, vec!["TEST\\Zeta", "TEST\\Alpha", "TEST\\Mid"]);
        assert!(children.iter().all(Node::exists));
    }

    #[test]
    fn children_of_absent_node_is_empty() {
        let hive = hive();
        let missing = hive.root().get_subnode("Missing").unwrap();
        assert!(missing.children().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    #[test]
    fn delete_subnode_removes_subtree() {
        let hive = hive();
        let root = hive.root();
        root.get_or_create_subnode("A\\B\\C").unwrap();
        root.get_or_create_subnode("Keep").unwrap();

        root.delete_subnode("A").unwrap();
        assert!(!root.get_subnode("A").unwrap().exists());
        assert!(!root.get_subnode("A\\B\\C").unwrap().exists());
        assert_eq!(child_names(&root), vec!["Keep"]);
    }

    #[test]
    fn delete_subnode_is_idempotent() {
        let hive = hive();
        let root = hive.root();
        root.get_or_create_subnode("A").unwrap();
        root.delete_subnode("A").unwrap();
        root.delete_subnode("A").unwrap();
        root.delete_subnode("Never\\Was").unwrap();
    }

    #[test]
    fn delete_subnode_under_absent_node_succeeds() {
        let hive = hive();
        let missing = hive.root().get_subnode("Missing").unwrap();
        missing.delete_subnode("Anything").unwrap();
    }

    #[test]
    fn delete_self() {
        let hive = hive();
        let root = hive.root();
        let b = root.get_or_create_subnode("A\\B").unwrap();
        b.delete().unwrap();
        assert!(root.get_subnode("A").unwrap().exists());
        assert!(!root.get_subnode("A\\B").unwrap().exists());
    }

    #[test]
    fn delete_absent_node_fails() {
        let hive = hive();
        let missing = hive.root().get_subnode("Missing").unwrap();
        let err = missing.delete().unwrap_err();
        assert!(matches!(err, HiveError::NotFound { .. }));
    }

    #[test]
    fn delete_root_is_unsupported() {
        let hive = hive();
        let err = hive.root().delete().unwrap_err();
        assert!(matches!(err, HiveError::Unsupported(_)));
        assert!(hive.root().exists());
    }

    #[test]
    fn deleted_through_another_handle_is_absent() {
        let hive = hive();
        let root = hive.root();
        let b = root.get_or_create_subnode("A\\B").unwrap();
        b.set("Count", &1).unwrap();
        b.get_or_create_subnode("C").unwrap();

        root.delete_subnode("A").unwrap();

        assert!(!b.exists());
        assert_eq!(b.state(), NodeState::Absent);
        assert!(b.get::<i32>("Count").unwrap_err().is_not_found());
        assert!(!b.has_value("Count").unwrap());
        assert!(!b.delete_value("Count").unwrap());
        assert!(b.values().unwrap().is_empty());
        assert!(b.children().unwrap().is_empty());
        assert!(!b.get_subnode("C").unwrap().exists());
        assert!(b.delete_subnode("C").is_ok());
        assert!(matches!(b.set("Count", &2), Err(HiveError::NotFound { .. })));
        assert!(matches!(b.delete(), Err(HiveError::NotFound { .. })));
    }

    #[test]
    fn delete_subnode_with_empty_path_targets_self() {
        let hive = hive();
        let root = hive.root();
        let a = root.get_or_create_subnode("A").unwrap();
        a.delete_subnode("").unwrap();
        assert!(!root.get_subnode("A").unwrap().exists());
    }
}
