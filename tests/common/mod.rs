//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use pongodb::{Database, DurabilityMode, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test writer (shown for failing tests).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Small chunks so growth paths run in tests.
pub const TEST_CHUNK_SIZE: u64 = 8192;

pub fn relaxed_options() -> OpenOptions {
    OpenOptions {
        chunk_size: TEST_CHUNK_SIZE,
        durability: DurabilityMode::Relaxed,
        ..OpenOptions::default()
    }
}

pub fn strict_options() -> OpenOptions {
    OpenOptions {
        chunk_size: TEST_CHUNK_SIZE,
        durability: DurabilityMode::Strict,
        ..OpenOptions::default()
    }
}

// ============================================================================
// TestDb - database in a scratch directory
// ============================================================================

pub struct TestDb {
    pub db: Arc<Database>,
    pub dir: TempDir,
    options: OpenOptions,
}

impl TestDb {
    /// Relaxed durability (no fsync per commit).
    pub fn new() -> Self {
        Self::with_options(relaxed_options())
    }

    /// Strict durability.
    pub fn new_strict() -> Self {
        Self::with_options(strict_options())
    }

    pub fn with_options(options: OpenOptions) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::open_with(dir.path().join("test.pongo"), options.clone())
            .expect("Failed to open test database");
        TestDb { db, dir, options }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("test.pongo")
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Close and reopen the same file.
    pub fn reopen(&mut self) {
        self.db.close().expect("close failed");
        self.db = Database::open_with(self.path(), self.options.clone()).expect("reopen failed");
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}
