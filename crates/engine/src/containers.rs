//! Container operations
//!
//! This module defines the member operations on Dict, List and Collection
//! containers, the namespace operations on the root Collection, and the
//! `atoms` anchoring of explicitly created containers.
//!
//! Every mutation validates first and writes last: keys, indices and the
//! incoming native tree are checked before any block is written, and the
//! container body is swapped only after all nested containers exist. A
//! failed call leaves the container unchanged; containers materialized for
//! it are unreachable and reclaimed by the next GC.
//!
//! List indices may be negative and resolve against the length.

use crate::database::{Database, Session};
use pongo_core::{
    ContainerHandle, ContainerKind, Key, Native, PongoError, PongoResult, Slot, Value,
};
use pongo_storage::{Body, ContainerRecord};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Resolve an element index against `len`, accepting `[-len, len)`
pub(crate) fn resolve_index(index: i64, len: usize) -> PongoResult<usize> {
    let n = len as i64;
    let at = if index < 0 { index + n } else { index };
    if at < 0 || at >= n {
        return Err(PongoError::index_out_of_range(index, len));
    }
    Ok(at as usize)
}

/// Resolve an insertion point against `len`, accepting `[-len, len]`
pub(crate) fn resolve_insert(index: i64, len: usize) -> PongoResult<usize> {
    let n = len as i64;
    let at = if index < 0 { index + n } else { index };
    if at < 0 || at > n {
        return Err(PongoError::index_out_of_range(index, len));
    }
    Ok(at as usize)
}

/// Integer index carried by a List key
pub(crate) fn list_index(key: &Key) -> PongoResult<i64> {
    key.as_index().ok_or_else(|| PongoError::InvalidKey {
        reason: format!("List index must be an integer, got {:?}", key),
    })
}

pub(crate) fn find_key(pairs: &[(Key, Value)], key: &Key) -> Option<usize> {
    pairs.iter().position(|(k, _)| k == key)
}

fn upsert(pairs: &mut Vec<(Key, Value)>, key: Key, value: Value) {
    match find_key(pairs, &key) {
        Some(i) => pairs[i].1 = value,
        None => pairs.push((key, value)),
    }
}

fn expect_list(h: ContainerHandle) -> PongoResult<()> {
    if h.kind != ContainerKind::List {
        return Err(PongoError::wrong_kind(ContainerKind::List, h.kind));
    }
    Ok(())
}

fn expect_dict_like(h: ContainerHandle) -> PongoResult<()> {
    if !h.kind.is_dict_like() {
        return Err(PongoError::wrong_kind("Dict or Collection", h.kind));
    }
    Ok(())
}

fn atom_key(h: ContainerHandle) -> Key {
    Key::Int(h.location.0 as i64)
}

impl<'a> Session<'a> {
    // ========================================================================
    // Handle validation and body access
    // ========================================================================

    /// Check a handle against its stored header and cache it for this pid
    pub(crate) fn open(&mut self, h: ContainerHandle) -> PongoResult<ContainerRecord> {
        let record = self.store.read_container(h.location)?;
        if record.generation != h.generation || record.kind != h.kind {
            return Err(PongoError::StaleHandle {
                location: h.location.0,
            });
        }
        self.db.pidcache.insert(self.pid, h);
        Ok(record)
    }

    pub(crate) fn load(&mut self, h: ContainerHandle) -> PongoResult<(ContainerRecord, Body)> {
        let record = self.open(h)?;
        let body = self.store.load_body(&record)?;
        Ok((record, body))
    }

    pub(crate) fn commit(
        &mut self,
        h: ContainerHandle,
        record: &ContainerRecord,
        body: &Body,
    ) -> PongoResult<()> {
        self.store.commit_body(h.location, record, body)?;
        Ok(())
    }

    /// Remove the atoms entries of containers that were just placed
    fn unanchor(&mut self, placed: &[ContainerHandle]) -> PongoResult<()> {
        if placed.is_empty() {
            return Ok(());
        }
        let keys: FxHashSet<Key> = placed.iter().map(|h| atom_key(*h)).collect();
        let atoms = self.db.atoms();
        let (record, body) = self.load(atoms)?;
        if let Body::Map(mut pairs) = body {
            let before = pairs.len();
            pairs.retain(|(k, _)| !keys.contains(k));
            if pairs.len() != before {
                self.commit(atoms, &record, &Body::Map(pairs))?;
            }
        }
        Ok(())
    }

    /// Commit `body` and release the atoms entries of `placed`
    fn finish(
        &mut self,
        h: ContainerHandle,
        record: &ContainerRecord,
        body: &Body,
        placed: &[ContainerHandle],
    ) -> PongoResult<()> {
        self.commit(h, record, body)?;
        self.unanchor(placed)
    }

    /// Key for an `AutoId` insert: the value's own id field if it has one,
    /// else a generated key
    ///
    /// A generated key is also written into a map value that lacks the id
    /// field.
    fn auto_key(&self, value: &mut Native) -> Key {
        let (id_field, source) = {
            let meta = self.db.meta.read();
            (meta.id_field().to_string(), meta.key_source())
        };
        match value.map_get(&id_field) {
            Some(Native::String(s)) => return Key::Str(s.clone()),
            Some(Native::Int(i)) => return Key::Int(*i),
            Some(_) => return source.generate(value),
            None => {}
        }
        let key = source.generate(value);
        if let Native::Map(pairs) = value {
            let id = match &key {
                Key::Str(s) => Native::String(s.clone()),
                Key::Int(i) => Native::Int(*i),
            };
            pairs.push((Key::Str(id_field), id));
        }
        key
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub(crate) fn get(&mut self, h: ContainerHandle, key: &Key) -> PongoResult<Value> {
        let (_, body) = self.load(h)?;
        match body {
            Body::List(mut items) => {
                let i = resolve_index(list_index(key)?, items.len())?;
                Ok(items.swap_remove(i))
            }
            Body::Map(pairs) => pairs
                .into_iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| PongoError::key_not_found(key)),
        }
    }

    /// Member value or `None`, without raising lookup errors
    pub(crate) fn lookup(&mut self, h: ContainerHandle, key: &Key) -> PongoResult<Option<Value>> {
        match self.get(h, key) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() || matches!(e, PongoError::InvalidKey { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn items(&mut self, h: ContainerHandle) -> PongoResult<Vec<(Key, Value)>> {
        let (_, body) = self.load(h)?;
        Ok(match body {
            Body::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Key::Int(i as i64), v))
                .collect(),
            Body::Map(pairs) => pairs,
        })
    }

    pub(crate) fn contains(&mut self, h: ContainerHandle, value: &Value) -> PongoResult<bool> {
        let (_, body) = self.load(h)?;
        Ok(match body {
            Body::List(items) => items.iter().any(|v| v == value),
            Body::Map(pairs) => {
                let key = match value {
                    Value::String(s) => Key::Str(s.clone()),
                    Value::Int(i) => Key::Int(*i),
                    _ => return Ok(false),
                };
                find_key(&pairs, &key).is_some()
            }
        })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub(crate) fn set(&mut self, h: ContainerHandle, slot: Slot, value: Native) -> PongoResult<Key> {
        let (record, mut body) = self.load(h)?;
        let mut resolved = self.resolve(value, 0)?;
        let key = match slot {
            Slot::Key(k) => k,
            Slot::AutoId if h.kind == ContainerKind::List => {
                return Err(PongoError::InvalidKey {
                    reason: "auto-id keys are not valid for a List".to_string(),
                })
            }
            Slot::AutoId => self.auto_key(&mut resolved),
        };

        let mut placed = Vec::new();
        match &mut body {
            Body::List(items) => {
                let i = resolve_index(list_index(&key)?, items.len())?;
                items[i] = self.materialize(&resolved, &mut placed)?;
            }
            Body::Map(pairs) => {
                let stored = self.materialize(&resolved, &mut placed)?;
                upsert(pairs, key.clone(), stored);
            }
        }
        self.finish(h, &record, &body, &placed)?;
        Ok(key)
    }

    pub(crate) fn update(
        &mut self,
        h: ContainerHandle,
        pairs: Vec<(Key, Native)>,
    ) -> PongoResult<()> {
        expect_dict_like(h)?;
        let (record, body) = self.load(h)?;
        let resolved = pairs
            .into_iter()
            .map(|(k, n)| Ok((k, self.resolve(n, 0)?)))
            .collect::<PongoResult<Vec<_>>>()?;

        let Body::Map(mut members) = body else {
            return Err(PongoError::wrong_kind("Dict or Collection", h.kind));
        };
        let mut placed = Vec::new();
        for (k, n) in &resolved {
            let stored = self.materialize(n, &mut placed)?;
            upsert(&mut members, k.clone(), stored);
        }
        self.finish(h, &record, &Body::Map(members), &placed)
    }

    pub(crate) fn extend(&mut self, h: ContainerHandle, values: Vec<Native>) -> PongoResult<()> {
        expect_list(h)?;
        let (record, body) = self.load(h)?;
        let resolved = values
            .into_iter()
            .map(|n| self.resolve(n, 0))
            .collect::<PongoResult<Vec<_>>>()?;

        let Body::List(mut items) = body else {
            return Err(PongoError::wrong_kind(ContainerKind::List, h.kind));
        };
        let mut placed = Vec::new();
        for n in &resolved {
            items.push(self.materialize(n, &mut placed)?);
        }
        self.finish(h, &record, &Body::List(items), &placed)
    }

    pub(crate) fn insert(&mut self, h: ContainerHandle, index: i64, value: Native) -> PongoResult<()> {
        expect_list(h)?;
        let (record, body) = self.load(h)?;
        let Body::List(mut items) = body else {
            return Err(PongoError::wrong_kind(ContainerKind::List, h.kind));
        };
        let at = resolve_insert(index, items.len())?;
        let resolved = self.resolve(value, 0)?;
        let mut placed = Vec::new();
        let stored = self.materialize(&resolved, &mut placed)?;
        items.insert(at, stored);
        self.finish(h, &record, &Body::List(items), &placed)
    }

    pub(crate) fn remove_value(&mut self, h: ContainerHandle, value: &Value) -> PongoResult<()> {
        expect_list(h)?;
        let (record, body) = self.load(h)?;
        let Body::List(mut items) = body else {
            return Err(PongoError::wrong_kind(ContainerKind::List, h.kind));
        };
        let at = items
            .iter()
            .position(|v| v == value)
            .ok_or(PongoError::ValueNotFound)?;
        items.remove(at);
        self.commit(h, &record, &Body::List(items))
    }

    pub(crate) fn pop(&mut self, h: ContainerHandle, index: i64) -> PongoResult<Value> {
        expect_list(h)?;
        let (record, body) = self.load(h)?;
        let Body::List(mut items) = body else {
            return Err(PongoError::wrong_kind(ContainerKind::List, h.kind));
        };
        let at = resolve_index(index, items.len())?;
        let value = items.remove(at);
        self.commit(h, &record, &Body::List(items))?;
        Ok(value)
    }

    pub(crate) fn pop_key(
        &mut self,
        h: ContainerHandle,
        key: &Key,
        default: Option<Value>,
    ) -> PongoResult<Value> {
        expect_dict_like(h)?;
        let (record, body) = self.load(h)?;
        let Body::Map(mut pairs) = body else {
            return Err(PongoError::wrong_kind("Dict or Collection", h.kind));
        };
        match find_key(&pairs, key) {
            Some(i) => {
                let (_, value) = pairs.remove(i);
                self.commit(h, &record, &Body::Map(pairs))?;
                Ok(value)
            }
            None => default.ok_or_else(|| PongoError::key_not_found(key)),
        }
    }

    pub(crate) fn delete(&mut self, h: ContainerHandle, key: &Key) -> PongoResult<()> {
        let (record, mut body) = self.load(h)?;
        match &mut body {
            Body::List(items) => {
                let at = resolve_index(list_index(key)?, items.len())?;
                items.remove(at);
            }
            Body::Map(pairs) => {
                let at = find_key(pairs, key).ok_or_else(|| PongoError::key_not_found(key))?;
                pairs.remove(at);
            }
        }
        self.commit(h, &record, &body)
    }

    pub(crate) fn clear(&mut self, h: ContainerHandle) -> PongoResult<()> {
        let (record, body) = self.load(h)?;
        if body.is_empty() {
            return Ok(());
        }
        self.commit(h, &record, &Body::empty(h.kind))
    }

    /// Replace every member of a Dict or List with the contents of a tree
    pub(crate) fn replace_contents(&mut self, h: ContainerHandle, native: Native) -> PongoResult<()> {
        let (record, _) = self.load(h)?;
        let resolved = self.resolve(native, 0)?;
        let mut placed = Vec::new();
        let body = match (h.kind, resolved) {
            (ContainerKind::List, Native::List(items)) => Body::List(
                items
                    .iter()
                    .map(|n| self.materialize(n, &mut placed))
                    .collect::<PongoResult<Vec<_>>>()?,
            ),
            (ContainerKind::Dict, Native::Map(pairs)) => {
                let mut members = Vec::with_capacity(pairs.len());
                for (k, n) in &pairs {
                    members.push((k.clone(), self.materialize(n, &mut placed)?));
                }
                Body::Map(crate::convert::dedupe_pairs(members))
            }
            (kind, other) => return Err(PongoError::wrong_kind(kind, other.type_name())),
        };
        self.finish(h, &record, &body, &placed)
    }

    // ========================================================================
    // Anchored containers and namespaces
    // ========================================================================

    pub(crate) fn create_anchored(&mut self, kind: ContainerKind) -> PongoResult<ContainerHandle> {
        let atoms = self.db.atoms();
        let (record, body) = self.load(atoms)?;
        let handle = self.create(kind, Body::empty(kind))?;
        let Body::Map(mut pairs) = body else {
            return Err(PongoError::corruption("atoms is not a Collection"));
        };
        pairs.push((atom_key(handle), Value::Ref(handle)));
        self.commit(atoms, &record, &Body::Map(pairs))?;
        debug!(target: "pongo::db", handle = %handle, "Created anchored container");
        Ok(handle)
    }

    pub(crate) fn abandon(&mut self, h: ContainerHandle) -> PongoResult<bool> {
        self.open(h)?;
        let atoms = self.db.atoms();
        let (record, body) = self.load(atoms)?;
        let Body::Map(mut pairs) = body else {
            return Err(PongoError::corruption("atoms is not a Collection"));
        };
        match find_key(&pairs, &atom_key(h)) {
            Some(i) => {
                pairs.remove(i);
                self.commit(atoms, &record, &Body::Map(pairs))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn create_collection(&mut self, name: &str) -> PongoResult<ContainerHandle> {
        let root = self.db.root();
        let (record, body) = self.load(root)?;
        let Body::Map(mut pairs) = body else {
            return Err(PongoError::corruption("root is not a Collection"));
        };
        let key = Key::from(name);
        if find_key(&pairs, &key).is_some() {
            return Err(PongoError::key_exists(name));
        }
        let kind = ContainerKind::Collection;
        let handle = self.create(kind, Body::empty(kind))?;
        pairs.push((key, Value::Ref(handle)));
        self.commit(root, &record, &Body::Map(pairs))?;
        debug!(target: "pongo::db", name, handle = %handle, "Created collection");
        Ok(handle)
    }

    pub(crate) fn collection(&mut self, name: &str) -> PongoResult<ContainerHandle> {
        match self.get(self.db.root(), &Key::from(name))? {
            Value::Ref(h) if h.kind == ContainerKind::Collection => Ok(h),
            other => Err(PongoError::wrong_kind(ContainerKind::Collection, other.type_name())),
        }
    }

    pub(crate) fn collections(&mut self) -> PongoResult<Vec<String>> {
        Ok(self
            .items(self.db.root())?
            .into_iter()
            .filter_map(|(k, v)| match (k, v) {
                (Key::Str(name), Value::Ref(h)) if h.kind == ContainerKind::Collection => Some(name),
                _ => None,
            })
            .collect())
    }

    pub(crate) fn drop_collection(&mut self, name: &str) -> PongoResult<()> {
        self.collection(name)?;
        self.delete(self.db.root(), &Key::from(name))
    }
}

// ============================================================================
// Public API
// ============================================================================

impl Database {
    /// Member value at `key`
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - Dict/Collection has no such key
    /// * `IndexOutOfRange` - List index outside `[-len, len)`
    /// * `InvalidKey` - non-integer key on a List
    /// * `StaleHandle` - the container no longer exists
    pub fn get(&self, h: ContainerHandle, key: impl Into<Key>) -> PongoResult<Value> {
        self.session()?.get(h, &key.into())
    }

    /// Insert or overwrite a member; returns the key used
    ///
    /// Nested maps and sequences in `value` become new Dict and List
    /// containers. On a List the index must already exist. With
    /// [`Slot::AutoId`] the key is taken from the value's id field when it
    /// carries one, otherwise generated and written into a map value's id
    /// field.
    pub fn set(
        &self,
        h: ContainerHandle,
        slot: impl Into<Slot>,
        value: impl Into<Native>,
    ) -> PongoResult<Key> {
        self.session()?.set(h, slot.into(), value.into())
    }

    /// Insert `value` under a generated (or id-field) key
    pub fn insert_auto(&self, h: ContainerHandle, value: impl Into<Native>) -> PongoResult<Key> {
        self.set(h, Slot::AutoId, value)
    }

    /// Insert or overwrite many members of a Dict or Collection in one commit
    pub fn update<K, V, I>(&self, h: ContainerHandle, pairs: I) -> PongoResult<()>
    where
        K: Into<Key>,
        V: Into<Native>,
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.session()?.update(h, pairs)
    }

    /// Append to a List
    pub fn append(&self, h: ContainerHandle, value: impl Into<Native>) -> PongoResult<()> {
        self.session()?.extend(h, vec![value.into()])
    }

    /// Append many values to a List in one commit
    pub fn extend<V, I>(&self, h: ContainerHandle, values: I) -> PongoResult<()>
    where
        V: Into<Native>,
        I: IntoIterator<Item = V>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.session()?.extend(h, values)
    }

    /// Insert into a List before `index`; `index` may equal the length
    pub fn insert(&self, h: ContainerHandle, index: i64, value: impl Into<Native>) -> PongoResult<()> {
        self.session()?.insert(h, index, value.into())
    }

    /// Remove the first List element equal to `value`
    ///
    /// Primitives compare by value (an Int never equals a Float), containers
    /// by location and generation. `ValueNotFound` if nothing matches.
    pub fn remove_value(&self, h: ContainerHandle, value: &Value) -> PongoResult<()> {
        self.session()?.remove_value(h, value)
    }

    /// Remove and return the List element at `index`
    pub fn pop(&self, h: ContainerHandle, index: i64) -> PongoResult<Value> {
        self.session()?.pop(h, index)
    }

    /// Remove and return a Dict/Collection member
    ///
    /// A missing key returns `default` if given, else `KeyNotFound`.
    pub fn pop_key(
        &self,
        h: ContainerHandle,
        key: impl Into<Key>,
        default: Option<Value>,
    ) -> PongoResult<Value> {
        self.session()?.pop_key(h, &key.into(), default)
    }

    /// Remove a member
    pub fn delete(&self, h: ContainerHandle, key: impl Into<Key>) -> PongoResult<()> {
        self.session()?.delete(h, &key.into())
    }

    /// Remove every member
    pub fn clear(&self, h: ContainerHandle) -> PongoResult<()> {
        self.session()?.clear(h)
    }

    /// Keys in order (indices for a List)
    pub fn keys(&self, h: ContainerHandle) -> PongoResult<Vec<Key>> {
        Ok(self.items(h)?.into_iter().map(|(k, _)| k).collect())
    }

    /// Values in order
    pub fn values(&self, h: ContainerHandle) -> PongoResult<Vec<Value>> {
        Ok(self.items(h)?.into_iter().map(|(_, v)| v).collect())
    }

    /// `(key, value)` pairs in order
    pub fn items(&self, h: ContainerHandle) -> PongoResult<Vec<(Key, Value)>> {
        self.session()?.items(h)
    }

    /// Number of members
    pub fn len(&self, h: ContainerHandle) -> PongoResult<usize> {
        let mut session = self.session()?;
        Ok(session.load(h)?.1.len())
    }

    /// True if the container has no members
    pub fn is_empty(&self, h: ContainerHandle) -> PongoResult<bool> {
        Ok(self.len(h)? == 0)
    }

    /// Key membership for Dict/Collection, value membership for List
    pub fn contains(&self, h: ContainerHandle, value: impl Into<Value>) -> PongoResult<bool> {
        self.session()?.contains(h, &value.into())
    }

    /// Deep copy into a native tree
    pub fn to_native(&self, h: ContainerHandle) -> PongoResult<Native> {
        self.session()?.to_native(h, 0)
    }

    /// Kind of a live container
    pub fn kind(&self, h: ContainerHandle) -> PongoResult<ContainerKind> {
        Ok(self.session()?.open(h)?.kind)
    }

    /// Create an empty Dict anchored in `atoms`
    pub fn create_dict(&self) -> PongoResult<ContainerHandle> {
        self.session()?.create_anchored(ContainerKind::Dict)
    }

    /// Create an empty List anchored in `atoms`
    pub fn create_list(&self) -> PongoResult<ContainerHandle> {
        self.session()?.create_anchored(ContainerKind::List)
    }

    /// Release a created container from `atoms`
    ///
    /// Returns `false` if it was not anchored (already placed or abandoned).
    /// An abandoned container that is not reachable otherwise is reclaimed by
    /// the next GC.
    pub fn abandon(&self, h: ContainerHandle) -> PongoResult<bool> {
        self.session()?.abandon(h)
    }

    /// Create a named Collection in the root namespace
    ///
    /// `KeyExists` if the name is taken.
    pub fn create_collection(&self, name: &str) -> PongoResult<ContainerHandle> {
        self.session()?.create_collection(name)
    }

    /// Handle of a named Collection
    pub fn collection(&self, name: &str) -> PongoResult<ContainerHandle> {
        self.session()?.collection(name)
    }

    /// Names of the root namespace Collections, in creation order
    pub fn collections(&self) -> PongoResult<Vec<String>> {
        self.session()?.collections()
    }

    /// Remove a named Collection; its contents are reclaimed by the next GC
    pub fn drop_collection(&self, name: &str) -> PongoResult<()> {
        self.session()?.drop_collection(name)
    }
}
