//! Persist a [`ChunkManifest`] as one virtual reference per present chunk.
//!
//! Chunks are visited in the manifest's row-major order and written one at a
//! time. Absent chunks produce no call. The first store failure stops the
//! walk; references already written stay in the store, whose own transaction
//! boundaries decide what is kept.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::manifest::ChunkManifest;
use crate::progress::Progress;
use crate::store::VirtualRefStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// References handed to the store.
    pub written: u64,
    /// Absent chunks that were skipped.
    pub skipped: u64,
    /// Sum of the lengths of written references, saturating at `u64::MAX`.
    pub bytes_referenced: u64,
}

impl WriteReport {
    fn absorb(&mut self, other: &WriteReport) {
        self.written = self.written.saturating_add(other.written);
        self.skipped = self.skipped.saturating_add(other.skipped);
        self.bytes_referenced = self.bytes_referenced.saturating_add(other.bytes_referenced);
    }
}

/// Store key for the chunk at `coord`: `prefix/c0/c1/.../cN-1`.
///
/// Trailing slashes on `prefix` are ignored; an empty prefix yields the bare
/// coordinate path and a zero-dimensional coordinate yields the prefix.
pub fn chunk_key(prefix: &str, coord: &[usize]) -> String {
    let prefix = prefix.trim_end_matches('/');
    let mut key = String::with_capacity(prefix.len() + coord.len() * 4);
    key.push_str(prefix);
    for c in coord {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&c.to_string());
    }
    key
}

/// Write every present chunk of `manifest` to `store` under `key_prefix`.
pub fn write_manifest_refs<S>(
    store: &mut S,
    key_prefix: &str,
    manifest: &ChunkManifest,
) -> Result<WriteReport>
where
    S: VirtualRefStore + ?Sized,
{
    write_manifest_refs_with_progress(store, key_prefix, manifest, &Progress::disabled())
}

pub fn write_manifest_refs_with_progress<S>(
    store: &mut S,
    key_prefix: &str,
    manifest: &ChunkManifest,
    prog: &Progress,
) -> Result<WriteReport>
where
    S: VirtualRefStore + ?Sized,
{
    let mut report = WriteReport::default();
    prog.add_chunks_total(manifest.len());
    for (coord, chunk) in manifest.iter() {
        let Some(chunk) = chunk else {
            report.skipped += 1;
            prog.inc_skipped();
            continue;
        };
        let key = chunk_key(key_prefix, &coord);
        debug!(
            %key,
            location = chunk.path,
            offset = chunk.offset,
            length = chunk.length,
            "set virtual ref"
        );
        if let Err(source) = store.set_virtual_ref(&key, chunk.path, chunk.offset, chunk.length) {
            warn!(%key, ?coord, written = report.written, "store rejected virtual ref");
            return Err(Error::StoreRejected { coord, key, source });
        }
        report.written += 1;
        report.bytes_referenced = report.bytes_referenced.saturating_add(chunk.length);
        prog.inc_written();
    }
    info!(
        prefix = key_prefix,
        written = report.written,
        skipped = report.skipped,
        "wrote manifest references"
    );
    Ok(report)
}

/// Write several named arrays under `group`, each to `group/name`, in the
/// order given. Stops at the first array that fails.
pub fn write_arrays<'a, S, I>(store: &mut S, group: &str, arrays: I) -> Result<WriteReport>
where
    S: VirtualRefStore + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a ChunkManifest)>,
{
    write_arrays_with_progress(store, group, arrays, &Progress::disabled())
}

pub fn write_arrays_with_progress<'a, S, I>(
    store: &mut S,
    group: &str,
    arrays: I,
    prog: &Progress,
) -> Result<WriteReport>
where
    S: VirtualRefStore + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a ChunkManifest)>,
{
    let mut total = WriteReport::default();
    for (name, manifest) in arrays {
        let prefix = chunk_key_prefix(group, name);
        prog.set_stage(&prefix);
        let r = write_manifest_refs_with_progress(store, &prefix, manifest, prog)?;
        total.absorb(&r);
    }
    Ok(total)
}

/// `group/name`, without doubled or leading separators.
pub fn chunk_key_prefix(group: &str, name: &str) -> String {
    let group = group.trim_matches('/');
    let name = name.trim_matches('/');
    match (group.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => group.to_string(),
        (false, false) => format!("{group}/{name}"),
    }
}
