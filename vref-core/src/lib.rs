//! Virtual chunk references for chunked N-dimensional arrays.
//!
//! A [`ChunkManifest`] records where each chunk's bytes live in external
//! files; [`write_manifest_refs`] persists it into a [`VirtualRefStore`] as
//! one reference per chunk; [`Resolver`] opens the referenced paths for
//! byte-range reads.

pub mod backend;
pub mod error;
pub mod manifest;
pub mod options;
pub mod path;
pub mod progress;
pub mod resolve;
pub mod store;
pub mod writer;

pub use error::{BoxError, Error, Result};
pub use manifest::{ChunkArray, ChunkEntry, ChunkManifest, ChunkRef};
pub use options::{merge_options, ReaderOptions, StorageOptions};
pub use path::{classify, protocol_of, PathClass};
pub use resolve::{OpenHandle, Resolver};
pub use store::{JsonRefStore, MemoryRefStore, VirtualRef, VirtualRefStore};
pub use writer::{chunk_key, write_arrays, write_manifest_refs, WriteReport};
