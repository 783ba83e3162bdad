//! Store Manager
//!
//! Manages a directory of named store files.
//!
//! ## Responsibilities
//! - Discover existing store files on startup
//! - Open stores lazily by name (one file per record family)
//! - Hand out shared handles to open stores

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::engine::ChainStore;
use crate::error::{ChainError, Result};

/// Manages the named stores inside one data directory
///
/// ## Concurrency:
/// - `stores`: Protected by RwLock (lookups share, first open is exclusive)
/// - Each `ChainStore` serializes its own operations
pub struct StoreManager {
    /// Directory holding the `{name}.db` files
    data_dir: PathBuf,

    /// Settings applied to every store (the path is replaced per name)
    template: Config,

    /// Names of store files found on disk at open time
    discovered: BTreeSet<String>,

    /// Stores opened so far, by name
    stores: RwLock<HashMap<String, Arc<ChainStore>>>,
}

impl StoreManager {
    /// File extension of store files
    const EXTENSION: &'static str = "db";

    /// Open or create a data directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing store files (nothing is opened yet)
    pub fn open(path: &Path, template: Config) -> Result<Self> {
        template.validate()?;
        fs::create_dir_all(path)?;

        let mut discovered = BTreeSet::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();

            if file_path.is_file() {
                if let Some(name) = Self::parse_store_name(&file_path) {
                    discovered.insert(name);
                }
            }
        }

        tracing::debug!(
            "Store directory {}: {} existing store(s)",
            path.display(),
            discovered.len()
        );

        Ok(Self {
            data_dir: path.to_path_buf(),
            template,
            discovered,
            stores: RwLock::new(HashMap::new()),
        })
    }

    /// Get the store called `name`, opening or creating `{name}.db` on first use
    pub fn store(&self, name: &str) -> Result<Arc<ChainStore>> {
        Self::validate_name(name)?;

        if let Some(store) = self.stores.read().get(name) {
            return Ok(Arc::clone(store));
        }

        let mut stores = self.stores.write();
        // Another caller may have opened it between the two locks
        if let Some(store) = stores.get(name) {
            return Ok(Arc::clone(store));
        }

        let mut config = self.template.clone();
        config.path = self.store_path(name);
        let store = Arc::new(ChainStore::open(config)?);
        stores.insert(name.to_string(), Arc::clone(&store));

        tracing::info!("Opened store '{}'", name);
        Ok(store)
    }

    /// Names of every known store (discovered on disk or opened since), sorted
    pub fn store_names(&self) -> Vec<String> {
        let stores = self.stores.read();
        let mut names = self.discovered.clone();
        names.extend(stores.keys().cloned());
        names.into_iter().collect()
    }

    /// Number of stores currently open
    pub fn open_count(&self) -> usize {
        self.stores.read().len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// "books" → "{data_dir}/books.db"
    fn store_path(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", name, Self::EXTENSION))
    }

    /// "users.db" → Some("users")
    fn parse_store_name(path: &Path) -> Option<String> {
        if path.extension()? != Self::EXTENSION {
            return None;
        }
        let name = path.file_stem()?.to_str()?;
        Self::validate_name(name).ok()?;
        Some(name.to_string())
    }

    fn validate_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ChainError::InvalidStoreName(name.to_string()));
        }
        Ok(())
    }
}
