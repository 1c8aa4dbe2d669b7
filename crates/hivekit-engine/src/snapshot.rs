//! On-disk image of a [`FileHive`](crate::FileHive).
//!
//! Format:
//! ```text
//! [4 bytes: magic "HKV1"]
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized Snapshot)]
//! ```
//!
//! The payload keeps every value cell ever written, reachable or not, so an
//! image grows with each overwrite.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub(crate) const MAGIC: [u8; 4] = *b"HKV1";

/// Header size: 4 bytes magic + 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NodeRecord {
    pub name: String,
    pub parent: Option<u64>,
    pub children: Vec<u64>,
    pub values: Vec<u64>,
}

impl NodeRecord {
    pub fn new(name: &str, parent: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            values: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ValueCell {
    pub name: String,
    pub kind: u32,
    pub data: Vec<u8>,
}

/// Node slots (deleted nodes leave `None`) and the append-only cell log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub nodes: Vec<Option<NodeRecord>>,
    pub cells: Vec<ValueCell>,
}

impl Snapshot {
    /// A hive holding nothing but an unnamed root.
    pub fn empty() -> Self {
        Self {
            nodes: vec![Some(NodeRecord::new("", None))],
            cells: Vec::new(),
        }
    }
}

pub(crate) fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let payload =
        bincode::serialize(snapshot).map_err(|e| EngineError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        EngineError::Serialization(format!("hive image too large: {} bytes", payload.len()))
    })?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Snapshot> {
    if bytes.len() < HEADER_SIZE {
        return Err(corrupt(format!("{} bytes is shorter than the header", bytes.len())));
    }
    if bytes[..4] != MAGIC {
        return Err(corrupt("bad magic".to_string()));
    }

    let length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let expected_crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != length {
        return Err(corrupt(format!(
            "payload length {} does not match header length {length}",
            payload.len()
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(corrupt(format!(
            "CRC mismatch: expected {expected_crc:#010x}, computed {actual_crc:#010x}"
        )));
    }

    let snapshot: Snapshot =
        bincode::deserialize(payload).map_err(|e| EngineError::Serialization(e.to_string()))?;
    validate(&snapshot)?;
    Ok(snapshot)
}

/// Check that every reference inside the image points at something live.
fn validate(snapshot: &Snapshot) -> Result<()> {
    match snapshot.nodes.first() {
        Some(Some(root)) if root.parent.is_none() => {}
        _ => return Err(corrupt("missing root node".to_string())),
    }

    let live = |slot: u64| {
        usize::try_from(slot)
            .ok()
            .and_then(|i| snapshot.nodes.get(i))
            .is_some_and(Option::is_some)
    };

    for (slot, record) in snapshot.nodes.iter().enumerate() {
        let Some(record) = record else { continue };
        if let Some(parent) = record.parent {
            if !live(parent) {
                return Err(corrupt(format!("node {slot} has dangling parent {parent}")));
            }
        }
        if let Some(child) = record.children.iter().find(|c| !live(**c)) {
            return Err(corrupt(format!("node {slot} has dangling child {child}")));
        }
        for &child in &record.children {
            if child == 0 {
                return Err(corrupt(format!("node {slot} lists the root as a child")));
            }
            let parent = usize::try_from(child)
                .ok()
                .and_then(|i| snapshot.nodes.get(i))
                .and_then(Option::as_ref)
                .and_then(|c| c.parent);
            if parent != Some(slot as u64) {
                return Err(corrupt(format!(
                    "node {child} is listed under {slot} but its parent is {parent:?}"
                )));
            }
        }
        if let Some(cell) = record
            .values
            .iter()
            .find(|v| usize::try_from(**v).map_or(true, |i| i >= snapshot.cells.len()))
        {
            return Err(corrupt(format!("node {slot} has dangling value cell {cell}")));
        }
    }
    Ok(())
}

fn corrupt(reason: String) -> EngineError {
    EngineError::Corrupt { reason }
}
