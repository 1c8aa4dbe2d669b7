//! The hive session: owner of one open storage engine.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::{Path, PathBuf};

use hivekit_engine::{EngineError, FileHive, HiveEngine, OpenOptions};
use tracing::{debug, error};

use crate::error::{engine_failure, HiveError, Result};
use crate::node::Node;

/// One open hive.
///
/// The hive owns its engine exclusively; [`Node`]s and [`Key`](crate::Key)s
/// borrow the hive and cannot outlive it. Dropping the hive closes the
/// engine. Nothing is written to disk until [`Hive::commit`].
///
/// The engine sits in a `RefCell`, so a hive is usable from one thread at a
/// time only.
pub struct Hive<E: HiveEngine = FileHive> {
    engine: RefCell<E>,
    path: Option<PathBuf>,
    name: String,
}

impl Hive<FileHive> {
    /// Open an existing hive file for reading and writing.
    ///
    /// Fails with [`HiveError::NotFound`] if `path` is not an existing
    /// regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, OpenOptions::default())
    }

    /// Open an existing hive file with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let engine = FileHive::open(path, options).map_err(|e| match e {
            EngineError::NotFound(_) => {
                error!(path = %path.display(), "could not open hive");
                HiveError::not_found(path.display().to_string())
            }
            e => engine_failure(format!("open {}", path.display()), e),
        })?;
        Ok(Self::with_path(engine, path))
    }

    /// Create a new, empty hive file and open it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let engine = FileHive::create(path)
            .map_err(|e| engine_failure(format!("create {}", path.display()), e))?;
        Ok(Self::with_path(engine, path))
    }

    fn with_path(engine: FileHive, path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut hive = Self::from_engine(engine, name);
        hive.path = Some(path.to_path_buf());
        hive
    }
}

impl<E: HiveEngine> Hive<E> {
    /// Wrap an already open engine. `name` becomes the root's display path.
    pub fn from_engine(engine: E, name: impl Into<String>) -> Self {
        Self {
            engine: RefCell::new(engine),
            path: None,
            name: name.into(),
        }
    }

    /// Path the hive was opened from, if it came from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Display name: the final component of the file path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root node.
    pub fn root(&self) -> Node<'_, E> {
        let root = self.engine().root();
        Node::existent(self, root, self.name.clone())
    }

    /// Shorthand for `self.root().get_subnode(path)`.
    pub fn node(&self, path: &str) -> Result<Node<'_, E>> {
        self.root().get_subnode(path)
    }

    /// Flush every pending mutation to the backing store.
    ///
    /// There is no rollback: if the commit fails the file keeps whatever the
    /// engine managed to write.
    pub fn commit(&self) -> Result<()> {
        self.engine_mut()
            .commit()
            .map_err(|e| engine_failure(format!("commit {}", self.name), e))?;
        debug!(hive = %self.name, "hive committed");
        Ok(())
    }

    /// Run `f` against the engine, e.g. to read engine-specific statistics.
    pub fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.engine())
    }

    /// Close the session and take the engine back.
    pub fn into_engine(self) -> E {
        self.engine.into_inner()
    }

    pub(crate) fn engine(&self) -> Ref<'_, E> {
        self.engine.borrow()
    }

    pub(crate) fn engine_mut(&self) -> RefMut<'_, E> {
        self.engine.borrow_mut()
    }
}

impl<E: HiveEngine> fmt::Debug for Hive<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hive")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}
