//! Path resolver
//!
//! A path is a delimited string (default `.`) naming a chain of members,
//! e.g. `"orders.3.total"`. Segments address Dicts and Collections by string
//! key and Lists by integer index (negative allowed). Non-string keys are
//! reachable as direct keys only.

use crate::database::{Database, Session};
use pongo_core::{parse_index, ContainerHandle, ContainerKind, Key, Native, PongoError, PongoResult, Slot, Value};
use smallvec::SmallVec;

/// Default path delimiter
pub const DEFAULT_SEPARATOR: &str = ".";

pub(crate) type Segments<'p> = SmallVec<[&'p str; 8]>;

pub(crate) fn split_path<'p>(path: &'p str, sep: &str) -> PongoResult<Segments<'p>> {
    if sep.is_empty() {
        return Err(PongoError::invalid_path(path, "empty delimiter"));
    }
    Ok(path.split(sep).collect())
}

/// Key a segment denotes inside a container of `kind`
pub(crate) fn segment_key(kind: ContainerKind, segment: &str, path: &str) -> PongoResult<Key> {
    match kind {
        ContainerKind::List => parse_index(segment).map(Key::Int).ok_or_else(|| {
            PongoError::invalid_path(path, format!("segment {:?} is not a List index", segment))
        }),
        _ => Ok(Key::from(segment)),
    }
}

/// Nest `value` under the remaining segments as fresh maps
fn nest(segments: &[&str], value: Native) -> Native {
    segments
        .iter()
        .rev()
        .fold(value, |acc, seg| Native::Map(vec![(Key::from(*seg), acc)]))
}

impl<'a> Session<'a> {
    pub(crate) fn get_path(
        &mut self,
        h: ContainerHandle,
        path: &str,
        sep: &str,
    ) -> PongoResult<Option<Value>> {
        self.open(h)?;
        let mut current = Value::Ref(h);
        for segment in split_path(path, sep)? {
            let Value::Ref(container) = current else {
                return Ok(None);
            };
            let Ok(key) = segment_key(container.kind, segment, path) else {
                return Ok(None);
            };
            match self.lookup(container, &key)? {
                Some(v) => current = v,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Walk all but the last segment without creating anything
    ///
    /// Returns the container holding the final segment, or the first missing
    /// Dict-like step as `Err((container, index))`.
    fn walk_parents(
        &mut self,
        h: ContainerHandle,
        segments: &[&str],
        path: &str,
    ) -> PongoResult<Result<ContainerHandle, (ContainerHandle, usize)>> {
        let mut current = h;
        for (i, segment) in segments.iter().enumerate() {
            let key = segment_key(current.kind, segment, path)?;
            let next = match self.get(current, &key) {
                Ok(v) => v,
                Err(PongoError::KeyNotFound { .. }) => return Ok(Err((current, i))),
                Err(e) => return Err(e),
            };
            current = match next {
                Value::Ref(child) => child,
                other => {
                    return Err(PongoError::invalid_path(
                        path,
                        format!("segment {:?} holds a {}, not a container", segment, other.type_name()),
                    ))
                }
            };
        }
        Ok(Ok(current))
    }

    pub(crate) fn set_path(
        &mut self,
        h: ContainerHandle,
        path: &str,
        sep: &str,
        value: Native,
        fail_if_exists: bool,
    ) -> PongoResult<()> {
        self.open(h)?;
        let segments = split_path(path, sep)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(PongoError::invalid_path(path, "empty path"));
        };

        let parent = match self.walk_parents(h, parents, path)? {
            Ok(parent) => parent,
            Err((container, i)) => {
                let nested = nest(&segments[i + 1..], value);
                self.set(container, Slot::Key(Key::from(parents[i])), nested)?;
                return Ok(());
            }
        };

        let key = segment_key(parent.kind, last, path)?;
        if fail_if_exists && self.lookup(parent, &key)?.is_some() {
            return Err(PongoError::key_exists(path));
        }
        self.set(parent, Slot::Key(key), value)?;
        Ok(())
    }

    pub(crate) fn delete_path(&mut self, h: ContainerHandle, path: &str, sep: &str) -> PongoResult<()> {
        self.open(h)?;
        let segments = split_path(path, sep)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(PongoError::invalid_path(path, "empty path"));
        };
        let parent = match self.walk_parents(h, parents, path)? {
            Ok(parent) => parent,
            Err((_, i)) => return Err(PongoError::key_not_found(parents[i])),
        };
        let key = segment_key(parent.kind, last, path)?;
        self.delete(parent, &key)
    }
}

impl Database {
    /// Value at a `.`-delimited path, or `default` if any segment is missing
    ///
    /// Misses never raise; a stale starting handle still does.
    pub fn get_path(&self, h: ContainerHandle, path: &str, default: Value) -> PongoResult<Value> {
        self.get_path_sep(h, path, DEFAULT_SEPARATOR, default)
    }

    /// [`get_path`](Self::get_path) with a custom delimiter
    pub fn get_path_sep(
        &self,
        h: ContainerHandle,
        path: &str,
        sep: &str,
        default: Value,
    ) -> PongoResult<Value> {
        Ok(self.session()?.get_path(h, path, sep)?.unwrap_or(default))
    }

    /// Assign at a `.`-delimited path, creating intermediate Dicts
    ///
    /// # Errors
    ///
    /// * `KeyExists` - `fail_if_exists` and the final segment is present
    /// * `InvalidPath` - a segment passes through a primitive, or a non-integer
    ///   segment addresses a List
    /// * `IndexOutOfRange` - a List index does not exist
    pub fn set_path(
        &self,
        h: ContainerHandle,
        path: &str,
        value: impl Into<Native>,
        fail_if_exists: bool,
    ) -> PongoResult<()> {
        self.set_path_sep(h, path, DEFAULT_SEPARATOR, value, fail_if_exists)
    }

    /// [`set_path`](Self::set_path) with a custom delimiter
    pub fn set_path_sep(
        &self,
        h: ContainerHandle,
        path: &str,
        sep: &str,
        value: impl Into<Native>,
        fail_if_exists: bool,
    ) -> PongoResult<()> {
        self.session()?
            .set_path(h, path, sep, value.into(), fail_if_exists)
    }

    /// Remove the member a `.`-delimited path names
    pub fn delete_path(&self, h: ContainerHandle, path: &str) -> PongoResult<()> {
        self.delete_path_sep(h, path, DEFAULT_SEPARATOR)
    }

    /// [`delete_path`](Self::delete_path) with a custom delimiter
    pub fn delete_path_sep(&self, h: ContainerHandle, path: &str, sep: &str) -> PongoResult<()> {
        self.session()?.delete_path(h, path, sep)
    }
}
