//! Named values addressed as keys.

use std::fmt;

use hivekit_engine::{HiveEngine, ValueType};

use crate::codec::{FromHiveValue, ToHiveValue, Value};
use crate::error::Result;
use crate::node::Node;

/// One named value on a [`Node`].
///
/// A key separates "does this value exist" from "does this tree position
/// exist": the node may exist while the value does not. All operations
/// delegate to the node's value-set operations.
pub struct Key<'h, E: HiveEngine> {
    node: Node<'h, E>,
    name: String,
}

impl<'h, E: HiveEngine> Key<'h, E> {
    pub(crate) fn new(node: Node<'h, E>, name: &str) -> Self {
        Self {
            node,
            name: name.to_string(),
        }
    }

    /// The value name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node the value belongs to.
    pub fn node(&self) -> &Node<'h, E> {
        &self.node
    }

    /// Display path of the value.
    pub fn path(&self) -> String {
        self.node.value_path(&self.name)
    }

    /// `true` if both the node and the value exist.
    pub fn exists(&self) -> Result<bool> {
        self.node.has_value(&self.name)
    }

    /// Stored type tag and byte length, if the value exists.
    pub fn value_type(&self) -> Result<Option<(ValueType, usize)>> {
        if !self.node.exists() {
            return Ok(None);
        }
        self.node.value_type(&self.name)
    }

    /// Read and decode the value as `T`.
    pub fn get<T: FromHiveValue>(&self) -> Result<T> {
        self.node.get(&self.name)
    }

    /// Read the value whatever its type.
    pub fn get_value(&self) -> Result<Value> {
        self.node.get_value(&self.name)
    }

    /// Add or overwrite the value.
    pub fn set<T: ToHiveValue + ?Sized>(&self, value: &T) -> Result<()> {
        self.node.set(&self.name, value)
    }

    /// See [`Node::change_if_different`].
    pub fn change_if_different<T>(&self, value: &T, or_if_absent: bool) -> Result<bool>
    where
        T: FromHiveValue + ToHiveValue + PartialEq,
    {
        self.node.change_if_different(&self.name, value, or_if_absent)
    }

    /// Delete the value. See [`Node::delete_value`].
    pub fn delete(&self) -> Result<bool> {
        self.node.delete_value(&self.name)
    }
}

impl<E: HiveEngine> Clone for Key<'_, E> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            name: self.name.clone(),
        }
    }
}

impl<E: HiveEngine> fmt::Debug for Key<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("node", &self.node)
            .field("name", &self.name)
            .finish()
    }
}
