//! Target stores for virtual references.
//!
//! The writer only needs [`VirtualRefStore::set_virtual_ref`]. Consistency,
//! versioning and transaction boundaries belong to the store.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BoxError, Result};

/// A store that accepts one virtual reference at a time.
pub trait VirtualRefStore {
    /// Record that the chunk stored under `key` lives at
    /// `location[offset..offset + length]`. Setting the same key to the same
    /// values again must be observably a no-op.
    fn set_virtual_ref(
        &mut self,
        key: &str,
        location: &str,
        offset: u64,
        length: u64,
    ) -> std::result::Result<(), BoxError>;
}

/// One stored reference, serialized as `[location, offset, length]`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VirtualRef(pub String, pub u64, pub u64);

impl VirtualRef {
    pub fn location(&self) -> &str {
        &self.0
    }
    pub fn offset(&self) -> u64 {
        self.1
    }
    pub fn length(&self) -> u64 {
        self.2
    }
}

/// In-memory store, ordered by key.
#[derive(Clone, Debug, Default)]
pub struct MemoryRefStore {
    refs: BTreeMap<String, VirtualRef>,
}

impl MemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&VirtualRef> {
        self.refs.get(key)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn refs(&self) -> &BTreeMap<String, VirtualRef> {
        &self.refs
    }

    pub fn into_refs(self) -> BTreeMap<String, VirtualRef> {
        self.refs
    }
}

impl VirtualRefStore for MemoryRefStore {
    fn set_virtual_ref(
        &mut self,
        key: &str,
        location: &str,
        offset: u64,
        length: u64,
    ) -> std::result::Result<(), BoxError> {
        self.refs.insert(key.to_string(), VirtualRef(location.to_string(), offset, length));
        Ok(())
    }
}

/// On-disk layout written by [`JsonRefStore::commit`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RefsFile {
    pub version: u32,
    pub created_utc: String,
    pub refs: BTreeMap<String, VirtualRef>,
}

/// Reference file store: references are staged in memory and persisted as
/// one JSON document on [`JsonRefStore::commit`].
///
/// Opening an existing file loads its references, so repeated runs against
/// the same output update it in place.
#[derive(Debug)]
pub struct JsonRefStore {
    path: PathBuf,
    staged: MemoryRefStore,
}

impl JsonRefStore {
    pub fn open(path: &Path) -> Result<Self> {
        let mut staged = MemoryRefStore::new();
        if path.exists() {
            let rf: RefsFile = serde_json::from_reader(File::open(path)?)?;
            staged.refs = rf.refs;
        }
        Ok(Self { path: path.to_path_buf(), staged })
    }

    pub fn refs(&self) -> &BTreeMap<String, VirtualRef> {
        self.staged.refs()
    }

    /// Write all references to disk (temp file + rename).
    pub fn commit(&self) -> Result<()> {
        let rf = RefsFile {
            version: 1,
            created_utc: chrono::Utc::now().to_rfc3339(),
            refs: self.staged.refs.clone(),
        };
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut f, &rf)?;
            f.write_all(b"\n")?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), refs = rf.refs.len(), "committed reference file");
        Ok(())
    }

    /// Read a committed reference file.
    pub fn load(path: &Path) -> Result<RefsFile> {
        Ok(serde_json::from_reader(File::open(path)?)?)
    }
}

impl VirtualRefStore for JsonRefStore {
    fn set_virtual_ref(
        &mut self,
        key: &str,
        location: &str,
        offset: u64,
        length: u64,
    ) -> std::result::Result<(), BoxError> {
        self.staged.set_virtual_ref(key, location, offset, length)
    }
}
