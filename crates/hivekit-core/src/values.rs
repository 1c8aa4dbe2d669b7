//! Value-set operations on a [`Node`].
//!
//! Value names are matched case-insensitively by every operation here,
//! including the in-memory scan of the delete protocol.
//!
//! Engines cannot drop a single value. [`Node::delete_value`] therefore
//! reads the whole value set, removes the first matching entry in memory and
//! installs the remainder with one [`HiveEngine::replace_values`] call. If
//! that call fails the node keeps its previous value set.

use hivekit_engine::{names_equal, HiveEngine, RawValue, ValueType};
use tracing::{debug, error, info, warn};

use crate::codec::{FromHiveValue, ToHiveValue, Value};
use crate::error::{engine_failure, HiveError, Result};
use crate::key::Key;
use crate::node::Node;
use crate::path::DELIMITER;

impl<'h, E: HiveEngine> Node<'h, E> {
    /// Display path of a value. Value names may themselves contain the
    /// delimiter, so they are appended verbatim.
    pub(crate) fn value_path(&self, name: &str) -> String {
        if self.path().is_empty() {
            name.to_string()
        } else {
            format!("{}{DELIMITER}{name}", self.path())
        }
    }

    /// Locate a value and read its type and bytes.
    fn lookup_raw(&self, name: &str) -> Result<Option<(ValueType, Vec<u8>)>> {
        let Some(node) = self.handle() else {
            warn!(parent = %self.path(), name, "value lookup under missing node");
            return Err(HiveError::not_found(self.value_path(name)));
        };

        let engine = self.hive().engine();
        let context = || format!("read {}", self.value_path(name));
        let Some(value) = engine
            .get_value(node, name)
            .map_err(|e| engine_failure(context(), e))?
        else {
            return Ok(None);
        };
        let (kind, _) = engine
            .value_type(value)
            .map_err(|e| engine_failure(context(), e))?;
        let data = engine
            .value_bytes(value)
            .map_err(|e| engine_failure(context(), e))?;
        Ok(Some((kind, data)))
    }

    /// Read and decode the value `name` as `T`.
    ///
    /// Fails with [`HiveError::NotFound`] if the node or value does not
    /// exist and with [`HiveError::TypeMismatch`] if it is stored under
    /// another type.
    pub fn get<T: FromHiveValue>(&self, name: &str) -> Result<T> {
        let Some((kind, data)) = self.lookup_raw(name)? else {
            info!(path = %self.value_path(name), "value not found");
            return Err(HiveError::not_found(self.value_path(name)));
        };

        let expected = T::TYPE;
        if kind != expected {
            debug!(path = %self.value_path(name), %expected, actual = %kind, "value type mismatch");
            return Err(HiveError::TypeMismatch {
                path: self.value_path(name),
                expected,
                actual: kind,
            });
        }

        T::decode(&data).map_err(|source| {
            error!(path = %self.value_path(name), error = %source, "value does not decode");
            HiveError::Decode {
                path: self.value_path(name),
                source,
            }
        })
    }

    /// Read the value `name` whatever its type.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        match self.lookup_raw(name)? {
            Some((kind, data)) => Ok(Value::from_raw(kind, &data)),
            None => {
                info!(path = %self.value_path(name), "value not found");
                Err(HiveError::not_found(self.value_path(name)))
            }
        }
    }

    /// Type tag and byte length of the value `name`, if it exists.
    pub fn value_type(&self, name: &str) -> Result<Option<(ValueType, usize)>> {
        Ok(self
            .lookup_raw(name)?
            .map(|(kind, data)| (kind, data.len())))
    }

    /// `true` if the node exists and has a value called `name`.
    pub fn has_value(&self, name: &str) -> Result<bool> {
        if !self.exists() {
            warn!(parent = %self.path(), name, "has_value on missing node");
            return Ok(false);
        }
        Ok(self.lookup_raw(name)?.is_some())
    }

    /// Add or overwrite the value `name`.
    ///
    /// Overwriting leaves the old bytes in the container as unreachable
    /// garbage.
    pub fn set<T: ToHiveValue + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let Some(node) = self.handle() else {
            warn!(parent = %self.path(), name, "set under missing node");
            return Err(HiveError::not_found(self.value_path(name)));
        };

        let raw = RawValue::new(name, value.value_type(), value.encode());
        self.hive()
            .engine_mut()
            .set_value(node, &raw)
            .map_err(|e| engine_failure(format!("set {}", self.value_path(name)), e))?;
        debug!(path = %self.value_path(name), kind = %raw.kind, len = raw.len(), "value set");
        Ok(())
    }

    /// Write `value` unless the stored value already equals it.
    ///
    /// A missing value (or one stored under another type) is written only
    /// when `or_if_absent` is set; otherwise the call fails with
    /// [`HiveError::NotFound`]. Returns `true` if anything was written.
    pub fn change_if_different<T>(&self, name: &str, value: &T, or_if_absent: bool) -> Result<bool>
    where
        T: FromHiveValue + ToHiveValue + PartialEq,
    {
        debug!(path = %self.value_path(name), "change if different");
        if !self.exists() {
            warn!(parent = %self.path(), name, "change under missing node");
            return Err(HiveError::not_found(self.value_path(name)));
        }

        match self.get::<T>(name) {
            Ok(current) if current == *value => Ok(false),
            Ok(_) => self.set(name, value).map(|()| true),
            Err(e) if e.is_not_found() && or_if_absent => self.set(name, value).map(|()| true),
            Err(e) if e.is_not_found() => {
                warn!(path = %self.value_path(name), "value to change not found");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the value `name`.
    ///
    /// Absence is success: returns `Ok(false)` when the node or value does
    /// not exist and `Ok(true)` when a value was removed. Fails only if the
    /// engine rejects the rewritten value set.
    pub fn delete_value(&self, name: &str) -> Result<bool> {
        let Some(node) = self.handle() else {
            warn!(parent = %self.path(), name, "delete value under missing node");
            return Ok(false);
        };

        let mut values = self.values()?;
        let Some(position) = values.iter().position(|v| names_equal(&v.name, name)) else {
            debug!(path = %self.value_path(name), "value to delete did not exist");
            return Ok(false);
        };
        values.remove(position);

        self.hive()
            .engine_mut()
            .replace_values(node, &values)
            .map_err(|e| engine_failure(format!("delete {}", self.value_path(name)), e))?;
        debug!(path = %self.value_path(name), remaining = values.len(), "value deleted");
        Ok(true)
    }

    /// Export every value of the node, in engine order, as raw triples.
    ///
    /// An absent node has no values.
    pub fn values(&self) -> Result<Vec<RawValue>> {
        debug!(path = %self.path(), "reading values");
        let Some(node) = self.handle() else {
            warn!(path = %self.path(), "values of missing node");
            return Ok(Vec::new());
        };

        let engine = self.hive().engine();
        let context = || format!("read values of {}", self.path());
        let values = engine
            .values(node)
            .map_err(|e| engine_failure(context(), e))?
            .into_iter()
            .map(|value| {
                engine
                    .read_value(value)
                    .map_err(|e| engine_failure(context(), e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(values)
    }

    /// Import raw values, one engine write each.
    ///
    /// Every entry is attempted. If any write fails the call returns
    /// [`HiveError::PartialWrite`] naming the values that were not stored.
    pub fn set_values(&self, values: &[RawValue]) -> Result<()> {
        let Some(node) = self.handle() else {
            warn!(path = %self.path(), "set values on missing node");
            return Err(HiveError::not_found(self.path()));
        };

        let mut failed = Vec::new();
        for value in values {
            let outcome = self.hive().engine_mut().set_value(node, value);
            if let Err(e) = outcome {
                error!(path = %self.value_path(&value.name), error = %e, "value write failed");
                failed.push(value.name.clone());
            }
        }

        if failed.is_empty() {
            debug!(path = %self.path(), count = values.len(), "values set");
            Ok(())
        } else {
            Err(HiveError::PartialWrite {
                path: self.path().to_string(),
                failed,
            })
        }
    }

    /// A handle on the value `name`, which need not exist yet.
    pub fn key(&self, name: &str) -> Key<'h, E> {
        Key::new(self.clone(), name)
    }

    /// A [`Key`] for every value of the node, in engine order.
    pub fn keys(&self) -> Result<Vec<Key<'h, E>>> {
        Ok(self
            .values()?
            .into_iter()
            .map(|value| self.key(&value.name))
            .collect())
    }
}
