//! Typed, path-addressed key/value access to hive files.
//!
//! A hive is a tree of named nodes; each node carries named values of a
//! handful of types. This crate layers typed access on top of any
//! [`HiveEngine`](hivekit_engine::HiveEngine):
//!
//! - [`Hive`] — the session that owns the engine
//! - [`Node`] — a position in the tree, reached by `\`-separated paths
//! - [`Key`] — one named value on a node
//! - [`codec`] — bit-exact encoding of `REG_DWORD`, `REG_SZ` and
//!   `REG_MULTI_SZ` values
//!
//! # Example
//!
//! ```
//! use hivekit_core::Hive;
//! use hivekit_engine::FileHive;
//!
//! let hive = Hive::from_engine(FileHive::in_memory(), "SOFTWARE");
//! let app = hive.root().get_or_create_subnode("Vendor\\App")?;
//! app.set("Version", "1.2")?;
//! app.set("Build", &42)?;
//!
//! assert_eq!(app.get::<i32>("build")?, 42);
//! assert!(app.delete_value("Version")?);
//! assert!(!hive.node("Vendor\\Other")?.exists());
//! # Ok::<(), hivekit_core::HiveError>(())
//! ```
//!
//! # Rules
//!
//! 1. Missing nodes are values, not errors: lookups return an absent
//!    [`Node`], and every operation on it is defined.
//! 2. Value names compare case-insensitively; node names compare with the
//!    engine's native rule.
//! 3. Deleting a missing value or subtree succeeds.
//! 4. Values of types this crate does not decode are preserved byte for
//!    byte whenever a value set is rewritten.

pub mod codec;
pub mod error;
pub mod hive;
pub mod key;
pub mod node;
pub mod path;
mod values;

pub use codec::{CodecError, FromHiveValue, ToHiveValue, Value};
pub use error::{HiveError, Result};
pub use hive::Hive;
pub use key::Key;
pub use node::{Node, NodeState};
pub use path::DELIMITER;
