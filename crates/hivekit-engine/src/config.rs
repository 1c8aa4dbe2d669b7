use serde::{Deserialize, Serialize};

/// How a hive file is opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Allow mutations and commits. A read-only hive rejects both.
    pub write: bool,
    /// Trace every engine mutation at debug level.
    pub verbose: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            write: true,
            verbose: false,
        }
    }
}

impl OpenOptions {
    /// Options for inspecting a hive without modifying it.
    pub fn read_only() -> Self {
        Self {
            write: false,
            ..Self::default()
        }
    }
}
