//! Path splitting and resolution.
//!
//! Paths are segments separated by [`DELIMITER`]. Empty segments produced by
//! leading, trailing or doubled delimiters are skipped, so `"\\A\\\\B\\"`
//! names the same node as `"A\\B"` and `""` names the starting node.

use hivekit_engine::HiveEngine;
use tracing::{debug, info, warn};

use crate::error::{engine_failure, Result};
use crate::node::Node;

/// Separator between path segments.
pub const DELIMITER: char = '\\';

/// The non-empty segments of `path`, in order.
///
/// ```
/// use hivekit_core::path::segments;
///
/// assert_eq!(segments("Software\\Vendor").collect::<Vec<_>>(), ["Software", "Vendor"]);
/// assert_eq!(segments("\\A\\\\B\\").collect::<Vec<_>>(), ["A", "B"]);
/// assert_eq!(segments("").count(), 0);
/// ```
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(DELIMITER).filter(|s| !s.is_empty())
}

/// Rewrite `path` with empty segments removed.
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("\\")
}

/// Join a display path and a relative path.
pub fn join(base: &str, rest: &str) -> String {
    let rest = normalize(rest);
    match (base.is_empty(), rest.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => rest,
        (false, false) => format!("{base}{DELIMITER}{rest}"),
    }
}

/// Walk `path` from `start`, one child lookup per segment.
///
/// A missing segment yields an absent node when `create` is false, and is
/// created with the segment's exact text when `create` is true. Starting
/// from an absent node yields an absent node without touching the engine.
pub(crate) fn resolve<'h, E: HiveEngine>(
    start: &Node<'h, E>,
    path: &str,
    create: bool,
) -> Result<Node<'h, E>> {
    let hive = start.hive();
    let full = join(start.path(), path);

    let Some(mut current) = start.handle() else {
        warn!(parent = %start.path(), %path, "lookup under missing node");
        return Ok(Node::absent(hive, full));
    };

    for segment in segments(path) {
        let found = hive
            .engine()
            .get_child(current, segment)
            .map_err(|e| engine_failure(format!("look up {segment} under {full}"), e))?;

        current = match found {
            Some(child) => child,
            None if create => {
                debug!(path = %full, segment, "creating subnode");
                hive.engine_mut()
                    .add_child(current, segment)
                    .map_err(|e| engine_failure(format!("create {segment} under {full}"), e))?
            }
            None => {
                info!(path = %full, missing = segment, "node not found");
                return Ok(Node::absent(hive, full));
            }
        };
    }

    Ok(Node::existent(hive, current, full))
}
