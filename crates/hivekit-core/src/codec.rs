//! Typed codec for hive values.
//!
//! Translates between Rust values and the raw `(type, bytes)` pairs engines
//! store, bit for bit:
//!
//! - `REG_DWORD` — 4 bytes, native-endian `i32`
//! - `REG_SZ` — UTF-16LE code units followed by one NUL unit
//! - `REG_MULTI_SZ` — each string as UTF-16LE + NUL, then one extra NUL
//!
//! Every other type is carried as [`Value::Untyped`] and written back
//! unchanged.

use std::fmt;

use hivekit_engine::{RawValue, ValueType};
use serde::Serialize;
use thiserror::Error;

/// Failure to decode the bytes of a correctly tagged value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("odd byte length {0} for UTF-16 data")]
    OddLength(usize),

    #[error("invalid UTF-16 text")]
    InvalidUtf16,

    #[error("invalid UTF-8 text")]
    InvalidUtf8,
}

// ---------------------------------------------------------------------------
// Primitive encoders
// ---------------------------------------------------------------------------

/// Encode a `REG_DWORD`.
pub fn encode_dword(value: i32) -> Vec<u8> {
    value.to_ne_bytes().to_vec()
}

/// Decode a `REG_DWORD`. The payload must be exactly 4 bytes.
pub fn decode_dword(data: &[u8]) -> Result<i32, CodecError> {
    let bytes: [u8; 4] = data.try_into().map_err(|_| CodecError::InvalidLength {
        expected: 4,
        actual: data.len(),
    })?;
    Ok(i32::from_ne_bytes(bytes))
}

fn push_utf16(out: &mut Vec<u8>, text: &str) {
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
}

fn utf16_units(data: &[u8]) -> Result<Vec<u16>, CodecError> {
    if data.len() % 2 != 0 {
        return Err(CodecError::OddLength(data.len()));
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode a `REG_SZ`.
pub fn encode_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity((text.len() + 1) * 2);
    push_utf16(&mut out, text);
    out
}

/// Decode a `REG_SZ`.
///
/// Reads up to the first NUL unit. An odd-length payload cannot be UTF-16;
/// it is taken to be text the engine already converted to UTF-8 and is
/// accepted if it is valid UTF-8.
pub fn decode_string(data: &[u8]) -> Result<String, CodecError> {
    if data.len() % 2 != 0 {
        let text = std::str::from_utf8(data).map_err(|_| CodecError::InvalidUtf8)?;
        return Ok(text.trim_end_matches('\0').to_string());
    }
    let units = utf16_units(data)?;
    let end = units.iter().position(|u| *u == 0).unwrap_or(units.len());
    String::from_utf16(&units[..end]).map_err(|_| CodecError::InvalidUtf16)
}

/// Encode a `REG_MULTI_SZ`. An empty list encodes as a single NUL unit.
pub fn encode_multi_string<S: AsRef<str>>(items: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for item in items {
        push_utf16(&mut out, item.as_ref());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// Decode a `REG_MULTI_SZ`.
///
/// Stops at the first empty string (the double NUL) and ignores anything
/// after it. An empty payload is an empty list.
pub fn decode_multi_string(data: &[u8]) -> Result<Vec<String>, CodecError> {
    let units = utf16_units(data)?;
    let mut items = Vec::new();
    for run in units.split(|u| *u == 0) {
        if run.is_empty() {
            break;
        }
        items.push(String::from_utf16(run).map_err(|_| CodecError::InvalidUtf16)?);
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Typed traits
// ---------------------------------------------------------------------------

/// A value that can be written to a hive.
pub trait ToHiveValue {
    /// Type tag the encoded bytes are stored under.
    fn value_type(&self) -> ValueType;

    /// The encoded bytes.
    fn encode(&self) -> Vec<u8>;
}

/// A value that can be read back from a hive.
pub trait FromHiveValue: Sized {
    /// The only type tag this value decodes from.
    const TYPE: ValueType;

    /// Decode bytes stored under [`Self::TYPE`].
    fn decode(data: &[u8]) -> Result<Self, CodecError>;
}

impl ToHiveValue for i32 {
    fn value_type(&self) -> ValueType {
        ValueType::Dword
    }

    fn encode(&self) -> Vec<u8> {
        encode_dword(*self)
    }
}

impl FromHiveValue for i32 {
    const TYPE: ValueType = ValueType::Dword;

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        decode_dword(data)
    }
}

impl ToHiveValue for str {
    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn encode(&self) -> Vec<u8> {
        encode_string(self)
    }
}

impl ToHiveValue for String {
    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn encode(&self) -> Vec<u8> {
        encode_string(self)
    }
}

impl FromHiveValue for String {
    const TYPE: ValueType = ValueType::String;

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        decode_string(data)
    }
}

impl<S: AsRef<str>> ToHiveValue for [S] {
    fn value_type(&self) -> ValueType {
        ValueType::MultiString
    }

    fn encode(&self) -> Vec<u8> {
        encode_multi_string(self)
    }
}

impl<S: AsRef<str>> ToHiveValue for Vec<S> {
    fn value_type(&self) -> ValueType {
        ValueType::MultiString
    }

    fn encode(&self) -> Vec<u8> {
        encode_multi_string(self)
    }
}

impl<S: AsRef<str>, const N: usize> ToHiveValue for [S; N] {
    fn value_type(&self) -> ValueType {
        ValueType::MultiString
    }

    fn encode(&self) -> Vec<u8> {
        encode_multi_string(self)
    }
}

impl FromHiveValue for Vec<String> {
    const TYPE: ValueType = ValueType::MultiString;

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        decode_multi_string(data)
    }
}

// ---------------------------------------------------------------------------
// Dynamic values
// ---------------------------------------------------------------------------

/// A decoded value of any type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Value {
    Dword(i32),
    String(String),
    MultiString(Vec<String>),
    /// A type this layer does not interpret, kept byte for byte.
    Untyped {
        kind: u32,
        #[serde(serialize_with = "serialize_hex")]
        data: Vec<u8>,
    },
}

fn serialize_hex<S: serde::Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data))
}

impl Value {
    /// Decode a stored value.
    ///
    /// Recognised types whose bytes do not decode fall back to
    /// [`Value::Untyped`], so nothing is lost.
    pub fn from_raw(kind: ValueType, data: &[u8]) -> Self {
        let decoded = match kind {
            ValueType::Dword => decode_dword(data).map(Self::Dword).ok(),
            ValueType::String => decode_string(data).map(Self::String).ok(),
            ValueType::MultiString => decode_multi_string(data).map(Self::MultiString).ok(),
            _ => None,
        };
        decoded.unwrap_or_else(|| Self::Untyped {
            kind: kind.as_raw(),
            data: data.to_vec(),
        })
    }

    /// Pair the encoded value with a name.
    pub fn to_raw(&self, name: impl Into<String>) -> RawValue {
        RawValue::new(name, self.value_type(), self.encode())
    }
}

impl ToHiveValue for Value {
    fn value_type(&self) -> ValueType {
        match self {
            Self::Dword(_) => ValueType::Dword,
            Self::String(_) => ValueType::String,
            Self::MultiString(_) => ValueType::MultiString,
            Self::Untyped { kind, .. } => ValueType::from_raw(*kind),
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Self::Dword(v) => encode_dword(*v),
            Self::String(s) => encode_string(s),
            Self::MultiString(items) => encode_multi_string(items),
            Self::Untyped { data, .. } => data.clone(),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Dword(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::MultiString(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dword(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::MultiString(items) => write!(f, "{items:?}"),
            Self::Untyped { kind, data } => {
                write!(f, "{} {}", ValueType::from_raw(*kind), hex::encode(data))
            }
        }
    }
}
