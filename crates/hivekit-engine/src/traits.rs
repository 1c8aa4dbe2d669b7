//! The [`HiveEngine`] trait: the primitives the typed layer is built on.
//!
//! An engine is a single-owner, synchronous handle to one open hive. Opening
//! is the implementor's constructor and closing is its `Drop`.

use crate::error::Result;
use crate::types::{NodeHandle, RawValue, ValueHandle, ValueType};

/// Storage backend for one open hive.
///
/// Implementations must satisfy these invariants:
/// - Lookups report absence as `Ok(None)`; `Err` means the engine itself
///   failed or was handed a handle it did not issue.
/// - `get_child` compares node names with the engine's native rule;
///   `get_value` and `set_value` compare value names case-insensitively.
/// - `set_value` overwrites in place: an existing value keeps its position.
/// - `replace_values` installs the complete new value set in one step.
/// - `delete_child` removes the node and its whole subtree.
pub trait HiveEngine {
    /// The root node of the hive.
    fn root(&self) -> NodeHandle;

    /// Look up a direct child by name.
    fn get_child(&self, parent: NodeHandle, name: &str) -> Result<Option<NodeHandle>>;

    /// Create a new child with exactly this name.
    fn add_child(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle>;

    /// Delete a node and everything below it.
    fn delete_child(&mut self, node: NodeHandle) -> Result<()>;

    /// Direct children in engine order.
    fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>>;

    /// The node's own name.
    fn node_name(&self, node: NodeHandle) -> Result<String>;

    /// `true` if `node` is still part of the tree. A handle stops being
    /// live once it, or any ancestor, has been deleted.
    fn contains(&self, node: NodeHandle) -> bool {
        self.node_name(node).is_ok()
    }

    /// Look up a value on a node by name.
    fn get_value(&self, node: NodeHandle, name: &str) -> Result<Option<ValueHandle>>;

    /// Type tag and byte length of a stored value.
    fn value_type(&self, value: ValueHandle) -> Result<(ValueType, usize)>;

    /// Raw bytes of a stored value.
    fn value_bytes(&self, value: ValueHandle) -> Result<Vec<u8>>;

    /// All values of a node in engine order.
    fn values(&self, node: NodeHandle) -> Result<Vec<ValueHandle>>;

    /// Name of a stored value.
    fn value_name(&self, value: ValueHandle) -> Result<String>;

    /// Add a value or overwrite the value with the same name.
    fn set_value(&mut self, node: NodeHandle, value: &RawValue) -> Result<()>;

    /// Replace the node's whole value set with `values`, in order.
    fn replace_values(&mut self, node: NodeHandle, values: &[RawValue]) -> Result<()>;

    /// Flush all pending mutations to durable storage.
    fn commit(&mut self) -> Result<()>;

    /// Read a stored value as a full `(name, type, bytes)` triple.
    fn read_value(&self, value: ValueHandle) -> Result<RawValue> {
        let name = self.value_name(value)?;
        let (kind, _) = self.value_type(value)?;
        let data = self.value_bytes(value)?;
        Ok(RawValue { name, kind, data })
    }
}
