//! Open a path as a byte-range readable handle.
//!
//! The [`Resolver`] classifies the path, derives its protocol identifier,
//! merges protocol defaults with caller storage options and hands the path to
//! the backend registered for that protocol.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::{Backend, ByteRangeRead, LocalBackend, MemoryBackend, ObjectStoreBackend};
use crate::error::{Error, Result};
use crate::options::{merge_options, protocol_defaults, ReaderOptions, StorageOptions};
use crate::path::{classify, protocol_of, PathClass};

/// Protocol-id -> backend registry.
#[derive(Clone)]
pub struct Resolver {
    backends: BTreeMap<String, Arc<dyn Backend>>,
    memory: MemoryBackend,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("protocols", &self.protocols()).finish()
    }
}

impl Resolver {
    /// Resolver with the built-in backends: `file`, `s3`, `gs`, `az`,
    /// `http`, `https` and a process-local `memory`.
    pub fn new() -> Self {
        let memory = MemoryBackend::new();
        let mut r = Self::empty();
        r.register("file", Arc::new(LocalBackend));
        let objects: Arc<dyn Backend> = Arc::new(ObjectStoreBackend);
        for protocol in ["s3", "gs", "az", "http", "https"] {
            r.register(protocol, objects.clone());
        }
        r.register("memory", Arc::new(memory.clone()));
        r.memory = memory;
        r
    }

    /// Resolver without any backend.
    pub fn empty() -> Self {
        Self { backends: BTreeMap::new(), memory: MemoryBackend::new() }
    }

    /// Register (or replace) the backend for `protocol`.
    pub fn register(&mut self, protocol: &str, backend: Arc<dyn Backend>) {
        self.backends.insert(protocol.to_ascii_lowercase(), backend);
    }

    pub fn protocols(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// The `memory://` filesystem served by [`Resolver::new`].
    pub fn memory(&self) -> &MemoryBackend {
        &self.memory
    }

    /// Storage options the backend for `path` would receive.
    pub fn effective_options(path: &str, options: &ReaderOptions) -> StorageOptions {
        merge_options(&protocol_defaults(&protocol_of(path)), &options.storage_options)
    }

    pub fn resolve(&self, path: &str, options: &ReaderOptions) -> Result<OpenHandle> {
        let class = classify(path);
        let protocol = protocol_of(path);
        let Some(backend) = self.backends.get(&protocol) else {
            return Err(Error::UnsupportedProtocol { protocol, path: path.to_string() });
        };
        let storage_options = Self::effective_options(path, options);
        debug!(path, %class, %protocol, options = storage_options.len(), "resolving path");
        let reader = backend.open(path, &storage_options).map_err(|source| Error::Open {
            path: path.to_string(),
            protocol: protocol.clone(),
            source,
        })?;
        Ok(OpenHandle { path: path.to_string(), class, protocol, reader })
    }
}

/// A path opened through its backend.
pub struct OpenHandle {
    path: String,
    class: PathClass,
    protocol: String,
    reader: Box<dyn ByteRangeRead>,
}

impl fmt::Debug for OpenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenHandle")
            .field("path", &self.path)
            .field("class", &self.class)
            .field("protocol", &self.protocol)
            .field("size", &self.reader.size())
            .finish()
    }
}

impl OpenHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn class(&self) -> &PathClass {
        &self.class
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn size(&self) -> u64 {
        self.reader.size()
    }

    pub fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.reader.read_range(offset, length).map_err(|source| Error::Read {
            path: self.path.clone(),
            offset,
            length,
            source,
        })
    }

    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.reader.close().map_err(|source| Error::Close { path, source })
    }
}
