//! Handles, value type tags and raw value triples exchanged with engines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque engine-assigned identifier of a node.
///
/// Handles are only meaningful to the engine that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// Wrap an engine-specific raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Opaque engine-assigned identifier of one stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueHandle(u64);

impl ValueHandle {
    /// Wrap an engine-specific raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}", self.0)
    }
}

/// Type tag of a stored value.
///
/// Tag numbers follow the registry conventions. Tags this crate has no name
/// for are kept as [`ValueType::Other`] so they survive a round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No type (0).
    None,
    /// NUL-terminated UTF-16LE string (1).
    String,
    /// UTF-16LE string with unexpanded environment references (2).
    ExpandString,
    /// Arbitrary bytes (3).
    Binary,
    /// 32-bit integer (4).
    Dword,
    /// Big-endian 32-bit integer (5).
    DwordBigEndian,
    /// Symbolic link (6).
    Link,
    /// Sequence of NUL-terminated UTF-16LE strings (7).
    MultiString,
    /// Resource list (8).
    ResourceList,
    /// Full resource descriptor (9).
    FullResourceDescriptor,
    /// Resource requirements list (10).
    ResourceRequirementsList,
    /// 64-bit integer (11).
    Qword,
    /// Any other tag, carried unchanged.
    Other(u32),
}

impl ValueType {
    /// Map a raw tag number to a type.
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::String,
            2 => Self::ExpandString,
            3 => Self::Binary,
            4 => Self::Dword,
            5 => Self::DwordBigEndian,
            6 => Self::Link,
            7 => Self::MultiString,
            8 => Self::ResourceList,
            9 => Self::FullResourceDescriptor,
            10 => Self::ResourceRequirementsList,
            11 => Self::Qword,
            other => Self::Other(other),
        }
    }

    /// The raw tag number.
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::String => 1,
            Self::ExpandString => 2,
            Self::Binary => 3,
            Self::Dword => 4,
            Self::DwordBigEndian => 5,
            Self::Link => 6,
            Self::MultiString => 7,
            Self::ResourceList => 8,
            Self::FullResourceDescriptor => 9,
            Self::ResourceRequirementsList => 10,
            Self::Qword => 11,
            Self::Other(raw) => raw,
        }
    }
}

impl From<u32> for ValueType {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

impl From<ValueType> for u32 {
    fn from(kind: ValueType) -> Self {
        kind.as_raw()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "REG_NONE"),
            Self::String => write!(f, "REG_SZ"),
            Self::ExpandString => write!(f, "REG_EXPAND_SZ"),
            Self::Binary => write!(f, "REG_BINARY"),
            Self::Dword => write!(f, "REG_DWORD"),
            Self::DwordBigEndian => write!(f, "REG_DWORD_BIG_ENDIAN"),
            Self::Link => write!(f, "REG_LINK"),
            Self::MultiString => write!(f, "REG_MULTI_SZ"),
            Self::ResourceList => write!(f, "REG_RESOURCE_LIST"),
            Self::FullResourceDescriptor => write!(f, "REG_FULL_RESOURCE_DESCRIPTOR"),
            Self::ResourceRequirementsList => write!(f, "REG_RESOURCE_REQUIREMENTS_LIST"),
            Self::Qword => write!(f, "REG_QWORD"),
            Self::Other(raw) => write!(f, "type {raw:#x}"),
        }
    }
}

/// A value as the engine stores it: name, type tag and raw bytes.
///
/// The byte length is `data.len()`. Nothing here is interpreted; values of
/// unknown type pass through byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawValue {
    pub name: String,
    pub kind: ValueType,
    pub data: Vec<u8>,
}

impl RawValue {
    /// Create a raw value triple.
    pub fn new(name: impl Into<String>, kind: ValueType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    /// Byte length of the stored data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the value carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_map_both_ways() {
        for raw in 0..=11u32 {
            let kind = ValueType::from_raw(raw);
            assert!(!matches!(kind, ValueType::Other(_)));
            assert_eq!(kind.as_raw(), raw);
        }
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let kind = ValueType::from(0x2000_0001);
        assert_eq!(kind, ValueType::Other(0x2000_0001));
        assert_eq!(u32::from(kind), 0x2000_0001);
    }

    #[test]
    fn display_names() {
        assert_eq!(ValueType::Dword.to_string(), "REG_DWORD");
        assert_eq!(ValueType::MultiString.to_string(), "REG_MULTI_SZ");
        assert_eq!(ValueType::Other(0x20).to_string(), "type 0x20");
    }

    #[test]
    fn raw_value_length() {
        let v = RawValue::new("Blob", ValueType::Binary, vec![1, 2, 3]);
        assert_eq!(v.len(), 3);
        assert!(!v.is_empty());
        assert!(RawValue::new("Empty", ValueType::None, vec![]).is_empty());
    }

    #[test]
    fn handle_display() {
        assert_eq!(NodeHandle::new(7).to_string(), "node#7");
        assert_eq!(ValueHandle::new(3).to_string(), "value#3");
    }
}
