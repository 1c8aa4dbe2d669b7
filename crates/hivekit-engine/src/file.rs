use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::OpenOptions;
use crate::error::{EngineError, Result};
use crate::names::names_equal;
use crate::snapshot::{self, NodeRecord, Snapshot, ValueCell};
use crate::traits::HiveEngine;
use crate::types::{NodeHandle, RawValue, ValueHandle, ValueType};

/// Counters describing the contents of a [`FileHive`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HiveStats {
    /// Live nodes, root included.
    pub nodes: usize,
    /// Values reachable from live nodes.
    pub values: usize,
    /// Value cells still stored but no longer reachable.
    pub garbage_cells: usize,
}

/// File-backed, append-only hive engine.
///
/// The whole hive is loaded into memory on open. Nodes live in a slot table
/// (a deleted node leaves an empty slot); values live in an append-only cell
/// log. Overwriting or removing a value never frees its old cell. `commit`
/// writes the complete image to a temporary file next to the target and
/// renames it into place.
pub struct FileHive {
    path: Option<PathBuf>,
    options: OpenOptions,
    nodes: Vec<Option<NodeRecord>>,
    cells: Vec<ValueCell>,
}

impl FileHive {
    /// Open an existing hive file.
    ///
    /// Fails with [`EngineError::NotFound`] if `path` is not an existing,
    /// readable regular file. A zero-length file opens as an empty hive.
    pub fn open(path: &Path, options: OpenOptions) -> Result<Self> {
        let bytes = Self::read_image(path)?;
        let snapshot = if bytes.is_empty() {
            Snapshot::empty()
        } else {
            snapshot::decode(&bytes)?
        };

        let hive = Self::from_snapshot(Some(path.to_path_buf()), options, snapshot);
        let stats = hive.stats();
        info!(
            path = %path.display(),
            write = hive.options.write,
            nodes = stats.nodes,
            values = stats.values,
            "hive opened"
        );
        Ok(hive)
    }

    /// Read the whole file. Anything that stops the file from being read
    /// at all (missing, not a regular file, no permission, read error)
    /// counts as not found.
    fn read_image(path: &Path) -> Result<Vec<u8>> {
        let not_found = |reason: &dyn std::fmt::Display| {
            debug!(path = %path.display(), %reason, "hive file not readable");
            EngineError::NotFound(path.to_path_buf())
        };

        let mut file = fs::File::open(path).map_err(|e| not_found(&e))?;
        let metadata = file.metadata().map_err(|e| not_found(&e))?;
        if !metadata.is_file() {
            return Err(not_found(&"not a regular file"));
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| not_found(&e))?;
        Ok(bytes)
    }

    /// Write a new, empty hive file and open it for writing.
    ///
    /// Fails if `path` already exists.
    pub fn create(path: &Path) -> Result<Self> {
        let bytes = snapshot::encode(&Snapshot::empty())?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        debug!(path = %path.display(), "hive created");
        Self::open(path, OpenOptions::default())
    }

    /// An empty hive that lives only in memory. `commit` is a no-op.
    pub fn in_memory() -> Self {
        Self::from_snapshot(None, OpenOptions::default(), Snapshot::empty())
    }

    fn from_snapshot(path: Option<PathBuf>, options: OpenOptions, snapshot: Snapshot) -> Self {
        Self {
            path,
            options,
            nodes: snapshot.nodes,
            cells: snapshot.cells,
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Options the hive was opened with.
    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Count live nodes, reachable values and garbage cells.
    pub fn stats(&self) -> HiveStats {
        let live = self.nodes.iter().flatten();
        let nodes = live.clone().count();
        let values = live.map(|n| n.values.len()).sum::<usize>();
        HiveStats {
            nodes,
            values,
            garbage_cells: self.cells.len().saturating_sub(values),
        }
    }

    // -----------------------------------------------------------------------
    // Slot helpers
    // -----------------------------------------------------------------------

    fn handle_of(slot: usize) -> NodeHandle {
        NodeHandle::new(slot as u64 + 1)
    }

    fn slot_of(handle: NodeHandle) -> Option<usize> {
        usize::try_from(handle.raw()).ok()?.checked_sub(1)
    }

    fn node(&self, handle: NodeHandle) -> Result<&NodeRecord> {
        Self::slot_of(handle)
            .and_then(|slot| self.nodes.get(slot))
            .and_then(Option::as_ref)
            .ok_or(EngineError::NoSuchNode(handle))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut NodeRecord> {
        Self::slot_of(handle)
            .and_then(|slot| self.nodes.get_mut(slot))
            .and_then(Option::as_mut)
            .ok_or(EngineError::NoSuchNode(handle))
    }

    fn cell(&self, handle: ValueHandle) -> Result<&ValueCell> {
        usize::try_from(handle.raw())
            .ok()
            .and_then(|i| self.cells.get(i))
            .ok_or(EngineError::NoSuchValue(handle))
    }

    fn append_cell(&mut self, value: &RawValue) -> u64 {
        self.cells.push(ValueCell {
            name: value.name.clone(),
            kind: value.kind.as_raw(),
            data: value.data.clone(),
        });
        (self.cells.len() - 1) as u64
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.options.write {
            Ok(())
        } else {
            Err(EngineError::ReadOnly)
        }
    }

    fn ensure_named(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(EngineError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

impl HiveEngine for FileHive {
    fn root(&self) -> NodeHandle {
        Self::handle_of(0)
    }

    fn get_child(&self, parent: NodeHandle, name: &str) -> Result<Option<NodeHandle>> {
        let record = self.node(parent)?;
        for &child in &record.children {
            let handle = Self::handle_of(child as usize);
            if self.node(handle)?.name == name {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    fn add_child(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle> {
        self.ensure_writable()?;
        Self::ensure_named(name)?;
        if self.get_child(parent, name)?.is_some() {
            return Err(EngineError::ChildExists {
                name: name.to_string(),
            });
        }
        let parent_slot = Self::slot_of(parent).ok_or(EngineError::NoSuchNode(parent))?;

        let slot = self.nodes.len();
        self.nodes
            .push(Some(NodeRecord::new(name, Some(parent_slot as u64))));
        self.node_mut(parent)?.children.push(slot as u64);

        let handle = Self::handle_of(slot);
        if self.options.verbose {
            debug!(%parent, %handle, name, "child added");
        }
        Ok(handle)
    }

    fn delete_child(&mut self, node: NodeHandle) -> Result<()> {
        self.ensure_writable()?;
        if node == self.root() {
            return Err(EngineError::CannotDeleteRoot);
        }
        let parent = self.node(node)?.parent;
        let slot = Self::slot_of(node).ok_or(EngineError::NoSuchNode(node))?;

        if let Some(parent) = parent {
            let parent = self.node_mut(Self::handle_of(parent as usize))?;
            parent.children.retain(|c| *c != slot as u64);
        }

        let mut pending = vec![slot];
        let mut removed = 0usize;
        while let Some(slot) = pending.pop() {
            if let Some(record) = self.nodes.get_mut(slot).and_then(Option::take) {
                pending.extend(record.children.iter().map(|c| *c as usize));
                removed += 1;
            }
        }

        if self.options.verbose {
            debug!(%node, removed, "subtree deleted");
        }
        Ok(())
    }

    fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>> {
        Ok(self
            .node(node)?
            .children
            .iter()
            .map(|c| Self::handle_of(*c as usize))
            .collect())
    }

    fn node_name(&self, node: NodeHandle) -> Result<String> {
        Ok(self.node(node)?.name.clone())
    }

    fn contains(&self, node: NodeHandle) -> bool {
        self.node(node).is_ok()
    }

    fn get_value(&self, node: NodeHandle, name: &str) -> Result<Option<ValueHandle>> {
        for &cell in &self.node(node)?.values {
            let handle = ValueHandle::new(cell);
            if names_equal(&self.cell(handle)?.name, name) {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    fn value_type(&self, value: ValueHandle) -> Result<(ValueType, usize)> {
        let cell = self.cell(value)?;
        Ok((ValueType::from_raw(cell.kind), cell.data.len()))
    }

    fn value_bytes(&self, value: ValueHandle) -> Result<Vec<u8>> {
        Ok(self.cell(value)?.data.clone())
    }

    fn values(&self, node: NodeHandle) -> Result<Vec<ValueHandle>> {
        Ok(self
            .node(node)?
            .values
            .iter()
            .map(|v| ValueHandle::new(*v))
            .collect())
    }

    fn value_name(&self, value: ValueHandle) -> Result<String> {
        Ok(self.cell(value)?.name.clone())
    }

    fn set_value(&mut self, node: NodeHandle, value: &RawValue) -> Result<()> {
        self.ensure_writable()?;
        let existing = self
            .get_value(node, &value.name)?
            .map(ValueHandle::raw);
        let cell = self.append_cell(value);

        let record = self.node_mut(node)?;
        match existing.and_then(|old| record.values.iter().position(|v| *v == old)) {
            Some(position) => record.values[position] = cell,
            None => record.values.push(cell),
        }

        if self.options.verbose {
            debug!(%node, name = %value.name, kind = %value.kind, len = value.len(), "value set");
        }
        Ok(())
    }

    fn replace_values(&mut self, node: NodeHandle, values: &[RawValue]) -> Result<()> {
        self.ensure_writable()?;
        // Validate the handle before appending anything.
        self.node(node)?;

        let mut staged: Vec<(String, u64)> = Vec::with_capacity(values.len());
        for value in values {
            let cell = self.append_cell(value);
            match staged.iter_mut().find(|(name, _)| names_equal(name, &value.name)) {
                Some(entry) => entry.1 = cell,
                None => staged.push((value.name.clone(), cell)),
            }
        }

        self.node_mut(node)?.values = staged.into_iter().map(|(_, cell)| cell).collect();

        if self.options.verbose {
            debug!(%node, count = values.len(), "value set replaced");
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_writable()?;
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let image = snapshot::Snapshot {
            nodes: self.nodes.clone(),
            cells: self.cells.clone(),
        };
        let bytes = snapshot::encode(&image)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| EngineError::Io(e.error))?;

        debug!(path = %path.display(), bytes = bytes.len(), "hive committed");
        Ok(())
    }
}

impl std::fmt::Debug for FileHive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("FileHive")
            .field("path", &self.path)
            .field("write", &self.options.write)
            .field("nodes", &stats.nodes)
            .field("values", &stats.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dword(name: &str, v: i32) -> RawValue {
        RawValue::new(name, ValueType::Dword, v.to_ne_bytes().to_vec())
    }

    fn names(hive: &FileHive, node: NodeHandle) -> Vec<String> {
        hive.values(node)
            .unwrap()
            .into_iter()
            .map(|v| hive.value_name(v).unwrap())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    #[test]
    fn empty_hive_has_unnamed_root() {
        let hive = FileHive::in_memory();
        let root = hive.root();
        assert_eq!(hive.node_name(root).unwrap(), "");
        assert!(hive.children(root).unwrap().is_empty());
        assert_eq!(hive.stats().nodes, 1);
    }

    #[test]
    fn add_and_find_child() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        let software = hive.add_child(root, "Software").unwrap();
        assert_eq!(hive.get_child(root, "Software").unwrap(), Some(software));
        assert_eq!(hive.node_name(software).unwrap(), "Software");
        assert_eq!(hive.children(root).unwrap(), vec![software]);
    }

    #[test]
    fn child_lookup_is_case_sensitive() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        hive.add_child(root, "Software").unwrap();
        assert_eq!(hive.get_child(root, "software").unwrap(), None);
    }

    #[test]
    fn duplicate_and_empty_child_names_are_rejected() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        hive.add_child(root, "A").unwrap();
        assert!(matches!(
            hive.add_child(root, "A"),
            Err(EngineError::ChildExists { .. })
        ));
        assert!(matches!(
            hive.add_child(root, ""),
            Err(EngineError::InvalidName { .. })
        ));
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        let b = hive.add_child(root, "B").unwrap();
        let a = hive.add_child(root, "A").unwrap();
        let c = hive.add_child(root, "C").unwrap();
        assert_eq!(hive.children(root).unwrap(), vec![b, a, c]);
    }

    #[test]
    fn delete_child_removes_subtree() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        let a = hive.add_child(root, "A").unwrap();
        let b = hive.add_child(a, "B").unwrap();
        let keep = hive.add_child(root, "Keep").unwrap();

        hive.delete_child(a).unwrap();
        assert_eq!(hive.children(root).unwrap(), vec![keep]);
        assert!(matches!(hive.node_name(a), Err(EngineError::NoSuchNode(_))));
        assert!(matches!(hive.node_name(b), Err(EngineError::NoSuchNode(_))));
        assert_eq!(hive.stats().nodes, 2);
    }

    #[test]
    fn deleted_handles_are_no_longer_contained() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        let a = hive.add_child(root, "A").unwrap();
        let b = hive.add_child(a, "B").unwrap();
        assert!(hive.contains(b));

        hive.delete_child(a).unwrap();
        assert!(hive.contains(root));
        assert!(!hive.contains(a));
        assert!(!hive.contains(b));
    }

    #[test]
    fn root_cannot_be_deleted() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        assert!(matches!(
            hive.delete_child(root),
            Err(EngineError::CannotDeleteRoot)
        ));
    }

    #[test]
    fn unknown_handles_are_errors() {
        let hive = FileHive::in_memory();
        assert!(matches!(
            hive.children(NodeHandle::new(99)),
            Err(EngineError::NoSuchNode(_))
        ));
        assert!(matches!(
            hive.children(NodeHandle::new(0)),
            Err(EngineError::NoSuchNode(_))
        ));
        assert!(matches!(
            hive.value_bytes(ValueHandle::new(5)),
            Err(EngineError::NoSuchValue(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_read_value() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        hive.set_value(root, &dword("Count", 42)).unwrap();

        let handle = hive.get_value(root, "count").unwrap().expect("case-insensitive");
        assert_eq!(hive.value_type(handle).unwrap(), (ValueType::Dword, 4));
        assert_eq!(hive.read_value(handle).unwrap(), dword("Count", 42));
    }

    #[test]
    fn overwrite_keeps_position_and_leaves_garbage() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        hive.set_value(root, &dword("A", 1)).unwrap();
        hive.set_value(root, &dword("B", 2)).unwrap();
        hive.set_value(root, &dword("C", 3)).unwrap();
        hive.set_value(root, &dword("b", 20)).unwrap();

        assert_eq!(names(&hive, root), vec!["A", "b", "C"]);
        let b = hive.get_value(root, "B").unwrap().unwrap();
        assert_eq!(hive.value_bytes(b).unwrap(), 20i32.to_ne_bytes().to_vec());
        assert_eq!(
            hive.stats(),
            HiveStats {
                nodes: 1,
                values: 3,
                garbage_cells: 1
            }
        );
    }

    #[test]
    fn replace_values_installs_exact_set() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        hive.set_value(root, &dword("A", 1)).unwrap();
        hive.set_value(root, &dword("B", 2)).unwrap();
        hive.set_value(root, &dword("C", 3)).unwrap();

        hive.replace_values(root, &[dword("A", 1), dword("C", 3)]).unwrap();
        assert_eq!(names(&hive, root), vec!["A", "C"]);
        assert_eq!(hive.get_value(root, "B").unwrap(), None);

        hive.replace_values(root, &[]).unwrap();
        assert!(hive.values(root).unwrap().is_empty());
    }

    #[test]
    fn replace_values_collapses_duplicate_names() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        hive.replace_values(root, &[dword("X", 1), dword("x", 2)]).unwrap();
        assert_eq!(names(&hive, root), vec!["x"]);
    }

    #[test]
    fn unknown_type_tags_round_trip() {
        let mut hive = FileHive::in_memory();
        let root = hive.root();
        let odd = RawValue::new("Odd", ValueType::Other(0x1234), vec![9, 8, 7]);
        hive.set_value(root, &odd).unwrap();
        let handle = hive.get_value(root, "Odd").unwrap().unwrap();
        assert_eq!(hive.read_value(handle).unwrap(), odd);
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FileHive::open(&dir.path().join("nope"), OpenOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn open_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FileHive::open(dir.path(), OpenOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreadable_file_is_not_found() {
        // A regular file whose first read fails with EIO.
        let err =
            FileHive::open(Path::new("/proc/self/mem"), OpenOptions::read_only()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)), "{err}");
    }

    #[test]
    fn zero_length_file_opens_empty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let hive = FileHive::open(file.path(), OpenOptions::default()).unwrap();
        assert_eq!(hive.stats().nodes, 1);
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a hive").unwrap();
        let err = FileHive::open(file.path(), OpenOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Corrupt { .. }));
    }

    #[test]
    fn commit_then_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SYSTEM");

        {
            let mut hive = FileHive::create(&path).unwrap();
            let root = hive.root();
            let select = hive.add_child(root, "Select").unwrap();
            hive.set_value(select, &dword("Current", 1)).unwrap();
            hive.commit().unwrap();
        }

        let hive = FileHive::open(&path, OpenOptions::default()).unwrap();
        let select = hive.get_child(hive.root(), "Select").unwrap().unwrap();
        let current = hive.get_value(select, "Current").unwrap().unwrap();
        assert_eq!(hive.value_bytes(current).unwrap(), 1i32.to_ne_bytes().to_vec());
    }

    #[test]
    fn uncommitted_changes_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SOFTWARE");
        {
            let mut hive = FileHive::create(&path).unwrap();
            let root = hive.root();
            hive.add_child(root, "Lost").unwrap();
        }
        let hive = FileHive::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(hive.get_child(hive.root(), "Lost").unwrap(), None);
    }

    #[test]
    fn create_refuses_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            FileHive::create(file.path()),
            Err(EngineError::Io(_))
        ));
    }

    #[test]
    fn read_only_rejects_mutation() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut hive = FileHive::open(file.path(), OpenOptions::read_only()).unwrap();
        let root = hive.root();
        assert!(matches!(hive.add_child(root, "A"), Err(EngineError::ReadOnly)));
        assert!(matches!(
            hive.set_value(root, &dword("A", 1)),
            Err(EngineError::ReadOnly)
        ));
        assert!(matches!(hive.replace_values(root, &[]), Err(EngineError::ReadOnly)));
        assert!(matches!(hive.commit(), Err(EngineError::ReadOnly)));
    }

    #[test]
    fn debug_format() {
        let hive = FileHive::in_memory();
        let debug = format!("{hive:?}");
        assert!(debug.contains("FileHive"));
        assert!(debug.contains("nodes"));
    }
}
