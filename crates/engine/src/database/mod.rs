//! Database struct and open/close logic
//!
//! This module provides the main Database struct that owns:
//! - The chunk store behind one data file
//! - The root namespace and the `atoms` anchor Collection
//! - The per-process handle cache
//! - The meta registry
//!
//! ## Sessions
//!
//! Every public operation runs inside a [`Session`]: the store mutex is held
//! for the whole call, so operations are atomic with respect to each other.
//! Opening a session is also where a changed process id (after a fork) is
//! detected and the allocator state re-derived from the file.
//!
//! Lock order is store, then meta.

pub mod config;
pub mod meta;
mod registry;

pub use config::{OpenOptions, LOCK_FILE_SUFFIX};
pub use meta::{KeyGenerator, Meta, MetaKey, MetaValue, UuidClass, UuidFactory};
pub use registry::OPEN_DATABASES;

use crate::pidcache::PidCache;
use fs2::FileExt;
use parking_lot::{Mutex, MutexGuard, RwLock};
use pongo_core::{ContainerHandle, ContainerKind, Location, PongoError, PongoResult};
use pongo_storage::{Body, ChunkStore, DurabilityMode, StoreStats};
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// An open PongoDB data file
///
/// `Database` is `Send + Sync`; share it through the `Arc` returned by
/// [`Database::open`]. Opening the same file again in the same process
/// returns the same instance.
///
/// # Example
///
/// ```text
/// use pongo_engine::Database;
///
/// let db = Database::open("/tmp/people.pongo")?;
/// let people = db.create_collection("people")?;
/// db.set(people, "ada", Native::map([("born", 1815)]))?;
/// db.close()?;
/// ```
pub struct Database {
    /// Canonical path of the data file
    path: PathBuf,

    /// Block store; held for the duration of every operation
    pub(crate) store: Mutex<ChunkStore>,

    /// Runtime settings
    pub(crate) meta: RwLock<Meta>,

    /// `(pid, location) -> handle` cache
    pub(crate) pidcache: PidCache,

    /// Root namespace Collection
    root: ContainerHandle,

    /// Anchor Collection for created but not yet placed containers
    atoms: ContainerHandle,

    /// Process that last used the store
    owner_pid: AtomicU32,

    closed: AtomicBool,

    /// Exclusive lock on `<file>.lock`, released on close
    lock_file: Mutex<Option<File>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("root", &self.root)
            .field("atoms", &self.atoms)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One operation's exclusive view of an open database
pub(crate) struct Session<'a> {
    pub(crate) db: &'a Database,
    pub(crate) store: MutexGuard<'a, ChunkStore>,
    pub(crate) pid: u32,
}

impl Database {
    /// Open (or create) the data file at `path` with default options
    ///
    /// # Errors
    ///
    /// * `Locked` - another process holds the file
    /// * `Corruption` - the file exists but is not a valid data file
    /// * `Io` - the file cannot be created or read
    pub fn open<P: AsRef<Path>>(path: P) -> PongoResult<Arc<Self>> {
        Self::open_with(path, OpenOptions::default())
    }

    /// Open (or create) the data file at `path`
    ///
    /// If the file is already open in this process the existing instance is
    /// returned and `options` are ignored.
    pub fn open_with<P: AsRef<Path>>(path: P, options: OpenOptions) -> PongoResult<Arc<Self>> {
        let path = canonical_path(path.as_ref())?;

        // Declared before the registry guard so a closed instance is dropped
        // after the guard is released.
        let mut _closed_instance = None;
        let mut registry = OPEN_DATABASES.lock();
        if let Some(db) = registry.get(&path).and_then(Weak::upgrade) {
            if !db.is_closed() {
                info!(target: "pongo::db", path = %path.display(), "Returning existing database instance");
                return Ok(db);
            }
            _closed_instance = Some(db);
        }

        let lock_file = if options.lock {
            Some(acquire_lock(&path)?)
        } else {
            None
        };

        let mut store = ChunkStore::open(&path, options.store_options())?;
        let (root, atoms) = bootstrap(&mut store)?;
        let superblock = store.superblock();
        let meta = Meta::new(
            superblock.chunk_size,
            superblock.id_field.clone(),
            store.durability(),
        );

        debug!(
            target: "pongo::db",
            durability = store.durability().description(),
            "Commit durability"
        );

        let db = Arc::new(Database {
            path: path.clone(),
            store: Mutex::new(store),
            meta: RwLock::new(meta),
            pidcache: PidCache::new(),
            root,
            atoms,
            owner_pid: AtomicU32::new(std::process::id()),
            closed: AtomicBool::new(false),
            lock_file: Mutex::new(lock_file),
        });
        registry.insert(path.clone(), Arc::downgrade(&db));

        info!(target: "pongo::db", path = %path.display(), root = %root, "Opened database");
        Ok(db)
    }

    /// Flush everything and release the file
    ///
    /// Idempotent. Any later operation fails with `Closed`; opening the path
    /// again yields a fresh instance.
    pub fn close(&self) -> PongoResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.store.lock().sync();

        if let Some(file) = self.lock_file.lock().take() {
            if let Err(e) = file.unlock() {
                warn!(target: "pongo::db", error = %e, "Failed to release lock file");
            }
        }

        {
            let mut registry = OPEN_DATABASES.lock();
            let is_self = registry
                .get(&self.path)
                .map_or(false, |weak| std::ptr::eq(weak.as_ptr(), self));
            if is_self {
                registry.remove(&self.path);
            }
        }

        info!(target: "pongo::db", path = %self.path.display(), "Closed database");
        result
    }

    /// True once [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Canonical path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root namespace handle
    pub fn root(&self) -> ContainerHandle {
        self.root
    }

    /// Handle of the `atoms` anchor Collection
    ///
    /// `create_dict`/`create_list` register new containers here (keyed by
    /// location) until they are placed somewhere reachable.
    pub fn atoms(&self) -> ContainerHandle {
        self.atoms
    }

    /// Current commit flush policy
    pub fn durability(&self) -> DurabilityMode {
        self.meta.read().durability
    }

    /// Allocator statistics
    pub fn stats(&self) -> PongoResult<StoreStats> {
        Ok(self.session()?.store.stats())
    }

    /// Persist the superblock and flush the data file
    pub fn sync(&self) -> PongoResult<()> {
        self.session()?.store.sync()
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub(crate) fn session(&self) -> PongoResult<Session<'_>> {
        self.session_as(std::process::id())
    }

    /// Session for process `pid`; a pid other than the last accessor's
    /// reloads allocator state from the file and drops foreign pidcache
    /// entries, as after a fork
    pub(crate) fn session_as(&self, pid: u32) -> PongoResult<Session<'_>> {
        if self.is_closed() {
            return Err(PongoError::Closed);
        }
        let mut store = self.store.lock();
        let owner = self.owner_pid.load(Ordering::Acquire);
        if pid != owner {
            warn!(
                target: "pongo::db",
                previous_pid = owner,
                pid,
                "Process changed since last access; reloading allocator state"
            );
            store.reopen()?;
            let purged = self.pidcache.purge_foreign(pid);
            debug!(target: "pongo::db", purged, "Dropped foreign pidcache entries");
            self.owner_pid.store(pid, Ordering::Release);
        }
        Ok(Session {
            db: self,
            store,
            pid,
        })
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.store.get_mut().sync() {
                warn!(target: "pongo::db", error = %e, "Final sync failed");
            }
        }

        let mut registry = OPEN_DATABASES.lock();
        let dead = registry
            .get(&self.path)
            .map_or(false, |weak| weak.strong_count() == 0);
        if dead {
            registry.remove(&self.path);
        }
    }
}

/// Canonicalize the parent directory (creating it if needed) and rejoin the
/// file name; the data file itself may not exist yet.
fn canonical_path(path: &Path) -> PongoResult<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' does not name a file", path.display()),
        )
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    Ok(parent.canonicalize()?.join(name))
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(LOCK_FILE_SUFFIX);
    PathBuf::from(name)
}

fn acquire_lock(path: &Path) -> PongoResult<File> {
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path(path))?;
    lock_file.try_lock_exclusive().map_err(|_| PongoError::Locked {
        path: path.display().to_string(),
    })?;
    Ok(lock_file)
}

/// Load the root and atoms Collections, creating them on a fresh file
fn bootstrap(store: &mut ChunkStore) -> PongoResult<(ContainerHandle, ContainerHandle)> {
    let (root_at, atoms_at) = (store.superblock().root, store.superblock().atoms);
    if root_at == 0 {
        let root = create_namespace(store)?;
        let atoms = create_namespace(store)?;
        store.update_superblock(|sb| {
            sb.root = root.location.0;
            sb.atoms = atoms.location.0;
        })?;
        store.sync()?;
        debug!(target: "pongo::db", root = %root, atoms = %atoms, "Created root namespace");
        return Ok((root, atoms));
    }
    Ok((load_namespace(store, root_at)?, load_namespace(store, atoms_at)?))
}

fn create_namespace(store: &mut ChunkStore) -> PongoResult<ContainerHandle> {
    let kind = ContainerKind::Collection;
    let (location, record) = store.create_container(kind, &Body::empty(kind))?;
    Ok(ContainerHandle::new(location, record.generation, kind))
}

fn load_namespace(store: &mut ChunkStore, offset: u64) -> PongoResult<ContainerHandle> {
    let location = Location(offset);
    let record = store.read_container(location).map_err(|e| {
        if e.is_stale() {
            PongoError::corruption(format!("superblock names no container at {}", location))
        } else {
            e
        }
    })?;
    if record.kind != ContainerKind::Collection {
        return Err(PongoError::corruption(format!(
            "namespace at {} is a {}, not a Collection",
            location, record.kind
        )));
    }
    Ok(ContainerHandle::new(location, record.generation, record.kind))
}
