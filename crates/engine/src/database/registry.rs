//! Process-wide map of open data files

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Weak;

use super::Database;

// =============================================================================
// Global Database Registry
// =============================================================================
//
// Opening the same data file twice returns the same Database instance, so two
// handles never race on one allocator. Entries are weak and are removed on
// close or drop.

/// Global registry of open databases (canonical data file path -> weak reference)
pub static OPEN_DATABASES: Lazy<Mutex<HashMap<PathBuf, Weak<Database>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
