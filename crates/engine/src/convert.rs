//! Native tree conversion
//!
//! Assignment happens in two passes. [`Session::resolve`] walks the incoming
//! tree, resolving `Opaque` values through [`Storable`](pongo_core::Storable),
//! checking depth and string limits and validating embedded handles. Nothing
//! is written until it succeeds. [`Session::materialize`] then writes nested
//! maps and sequences as new Dict and List containers, children first.
//!
//! Collections are never created here.

use crate::database::Session;
use pongo_core::limits::{check_depth, check_string};
use pongo_core::{resolve_storable, ContainerHandle, ContainerKind, Key, Native, PongoError, PongoResult, Value};
use pongo_storage::Body;
use rustc_hash::FxHashMap;

/// Collapse duplicate keys, keeping the first position and the last value
pub(crate) fn dedupe_pairs<V>(pairs: Vec<(Key, V)>) -> Vec<(Key, V)> {
    let mut index: FxHashMap<Key, usize> = FxHashMap::default();
    let mut out: Vec<(Key, V)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        match index.get(&key) {
            Some(&i) => out[i].1 = value,
            None => {
                index.insert(key.clone(), out.len());
                out.push((key, value));
            }
        }
    }
    out
}

impl<'a> Session<'a> {
    /// Resolve a native tree into plain nodes, validating everything that
    /// could make the assignment fail
    pub(crate) fn resolve(&mut self, native: Native, depth: usize) -> PongoResult<Native> {
        check_depth(depth)?;
        match native {
            Native::Opaque(host) => {
                let resolved = resolve_storable(host.as_ref())?;
                self.resolve(resolved, depth + 1)
            }
            Native::List(items) => items
                .into_iter()
                .map(|n| self.resolve(n, depth + 1))
                .collect::<PongoResult<Vec<_>>>()
                .map(Native::List),
            Native::Map(pairs) => pairs
                .into_iter()
                .map(|(k, n)| Ok((k, self.resolve(n, depth + 1)?)))
                .collect::<PongoResult<Vec<_>>>()
                .map(Native::Map),
            Native::Handle(h) => {
                self.open(h)?;
                Ok(Native::Handle(h))
            }
            Native::String(s) => {
                check_string(&s)?;
                Ok(Native::String(s))
            }
            scalar => Ok(scalar),
        }
    }

    /// Write a resolved tree, returning the value to store in the parent
    ///
    /// Existing handles embedded in the tree are collected in `placed`.
    pub(crate) fn materialize(
        &mut self,
        native: &Native,
        placed: &mut Vec<ContainerHandle>,
    ) -> PongoResult<Value> {
        match native {
            Native::List(items) => {
                let values = items
                    .iter()
                    .map(|n| self.materialize(n, placed))
                    .collect::<PongoResult<Vec<_>>>()?;
                self.create(ContainerKind::List, Body::List(values))
                    .map(Value::Ref)
            }
            Native::Map(pairs) => {
                let mut stored = Vec::with_capacity(pairs.len());
                for (k, n) in pairs {
                    stored.push((k.clone(), self.materialize(n, placed)?));
                }
                self.create(ContainerKind::Dict, Body::Map(dedupe_pairs(stored)))
                    .map(Value::Ref)
            }
            Native::Handle(h) => {
                placed.push(*h);
                Ok(Value::Ref(*h))
            }
            Native::Opaque(host) => Err(PongoError::type_not_storable(host.type_name())),
            scalar => scalar
                .as_value()
                .ok_or_else(|| PongoError::type_not_storable(scalar.type_name())),
        }
    }

    /// Write a new container and record it in the pidcache
    pub(crate) fn create(&mut self, kind: ContainerKind, body: Body) -> PongoResult<ContainerHandle> {
        let (location, record) = self.store.create_container(kind, &body)?;
        let handle = ContainerHandle::new(location, record.generation, kind);
        self.db.pidcache.insert(self.pid, handle);
        Ok(handle)
    }

    /// Deep copy of a container into a native tree
    pub(crate) fn to_native(&mut self, h: ContainerHandle, depth: usize) -> PongoResult<Native> {
        check_depth(depth)?;
        let (_, body) = self.load(h)?;
        match body {
            Body::List(items) => items
                .into_iter()
                .map(|v| self.value_to_native(v, depth + 1))
                .collect::<PongoResult<Vec<_>>>()
                .map(Native::List),
            Body::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| Ok((k, self.value_to_native(v, depth + 1)?)))
                .collect::<PongoResult<Vec<_>>>()
                .map(Native::Map),
        }
    }

    fn value_to_native(&mut self, value: Value, depth: usize) -> PongoResult<Native> {
        match value {
            Value::Ref(child) => self.to_native(child, depth),
            other => Ok(Native::from(other)),
        }
    }
}
