//! Storage engine contract for hivekit hives.
//!
//! A hive is an append-only tree container: named nodes, each carrying an
//! ordered list of children and a set of named, typed values. Engines can add
//! nodes, add or overwrite values, replace a node's whole value set, and drop
//! whole subtrees. They cannot free the bytes of an overwritten value; those
//! stay in the container as unreachable cells until it is rebuilt.
//!
//! # Modules
//!
//! - [`error`] — [`EngineError`] and the [`Result`] alias
//! - [`types`] — handles, [`ValueType`] tags and the [`RawValue`] triple
//! - [`traits`] — the [`HiveEngine`] trait every backend implements
//! - [`names`] — value-name comparison shared by engines and callers
//! - [`config`] — [`OpenOptions`] for opening a hive file
//! - [`file`] — [`FileHive`], the bundled file-backed engine
//!
//! # Engine Rules
//!
//! 1. Absence is `None`, never a zero handle.
//! 2. Node names compare exactly; value names compare case-insensitively.
//! 3. Overwriting a value keeps its position in the node's value order.
//! 4. Nothing reaches disk until [`HiveEngine::commit`].

pub mod config;
pub mod error;
pub mod file;
pub mod names;
mod snapshot;
pub mod traits;
pub mod types;

pub use config::OpenOptions;
pub use error::{EngineError, Result};
pub use file::{FileHive, HiveStats};
pub use names::names_equal;
pub use traits::HiveEngine;
pub use types::{NodeHandle, RawValue, ValueHandle, ValueType};
