//! Chunk manifests: where every chunk of a chunked array lives.
//!
//! A [`ChunkManifest`] holds one `(path, offset, length)` record per chunk
//! grid coordinate. Records are kept field-by-field in three flat buffers
//! laid out in row-major (C) order, so coordinate `i` in every buffer is the
//! same chunk. The shape invariant is checked once at construction; there is
//! no mutation API.
//!
//! A chunk whose record is `("", 0, 0)` is absent. Any other record, including
//! a zero-length one with a non-empty path, is present.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A flat buffer together with the N-dimensional shape it represents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkArray<T> {
    shape: Vec<usize>,
    values: Vec<T>,
}

impl<T> ChunkArray<T> {
    /// `values` must hold exactly one element per grid coordinate, in
    /// row-major order.
    pub fn new(shape: Vec<usize>, values: Vec<T>) -> Result<Self> {
        let n = grid_len(&shape)?;
        if n != values.len() {
            return Err(Error::ShapeMismatch {
                field: "values",
                expected: shape,
                found: vec![values.len()],
            });
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// Borrowed view of one present chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRef<'a> {
    pub path: &'a str,
    pub offset: u64,
    pub length: u64,
}

impl ChunkRef<'_> {
    pub fn to_entry(&self) -> ChunkEntry {
        ChunkEntry { path: self.path.to_string(), offset: self.offset, length: self.length }
    }
}

/// Owned chunk record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChunkEntry {
    pub path: String,
    pub offset: u64,
    pub length: u64,
}

impl ChunkEntry {
    pub fn new(path: impl Into<String>, offset: u64, length: u64) -> Self {
        Self { path: path.into(), offset, length }
    }

    /// The absence sentinel `("", 0, 0)`.
    pub fn absent() -> Self {
        Self { path: String::new(), offset: 0, length: 0 }
    }

    pub fn is_absent(&self) -> bool {
        is_sentinel(&self.path, self.offset, self.length)
    }
}

fn is_sentinel(path: &str, offset: u64, length: u64) -> bool {
    path.is_empty() && offset == 0 && length == 0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkManifest {
    shape: Vec<usize>,
    paths: Vec<String>,
    offsets: Vec<u64>,
    lengths: Vec<u64>,
}

impl ChunkManifest {
    /// Build a manifest from three co-shaped field arrays. Every field must
    /// have exactly the chunk-grid shape `shape`, and every grid dimension
    /// must be positive.
    pub fn new(
        shape: Vec<usize>,
        paths: ChunkArray<String>,
        offsets: ChunkArray<u64>,
        lengths: ChunkArray<u64>,
    ) -> Result<Self> {
        if shape.contains(&0) {
            // every grid dimension holds at least one chunk
            return Err(Error::ShapeMismatch {
                field: "shape",
                expected: shape.iter().map(|&d| d.max(1)).collect(),
                found: shape,
            });
        }
        check_field_shape("paths", &shape, paths.shape())?;
        check_field_shape("offsets", &shape, offsets.shape())?;
        check_field_shape("lengths", &shape, lengths.shape())?;
        Ok(Self { shape, paths: paths.values, offsets: offsets.values, lengths: lengths.values })
    }

    /// Like [`ChunkManifest::new`] for signed sources; negative offsets or
    /// lengths are rejected with [`Error::InvalidEntry`].
    pub fn from_signed(
        shape: Vec<usize>,
        paths: ChunkArray<String>,
        offsets: ChunkArray<i64>,
        lengths: ChunkArray<i64>,
    ) -> Result<Self> {
        let offsets = ChunkArray {
            values: to_unsigned("offsets", &offsets.values)?,
            shape: offsets.shape,
        };
        let lengths = ChunkArray {
            values: to_unsigned("lengths", &lengths.values)?,
            shape: lengths.shape,
        };
        Self::new(shape, paths, offsets, lengths)
    }

    /// Build a manifest from sparse `(coord, entry)` pairs; coordinates not
    /// listed are absent. A later entry for the same coordinate wins.
    pub fn from_entries<I>(shape: Vec<usize>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<usize>, ChunkEntry)>,
    {
        let n = grid_len(&shape)?;
        let mut paths = vec![String::new(); n];
        let mut offsets = vec![0u64; n];
        let mut lengths = vec![0u64; n];
        for (coord, entry) in entries {
            let i = flat_index(&shape, &coord)?;
            paths[i] = entry.path;
            offsets[i] = entry.offset;
            lengths[i] = entry.length;
        }
        Self::new(
            shape.clone(),
            ChunkArray::new(shape.clone(), paths)?,
            ChunkArray::new(shape.clone(), offsets)?,
            ChunkArray::new(shape, lengths)?,
        )
    }

    /// Chunk-grid shape: number of chunks along each array dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of grid coordinates, present or absent.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Record at `coord`, `None` when the chunk is absent.
    pub fn get(&self, coord: &[usize]) -> Result<Option<ChunkRef<'_>>> {
        let i = flat_index(&self.shape, coord)?;
        Ok(self.at(i))
    }

    /// Every coordinate in row-major order (last dimension fastest), with
    /// its record or `None` for absent chunks.
    pub fn iter(&self) -> ChunkIter<'_> {
        ChunkIter { manifest: self, next: 0, coord: vec![0; self.shape.len()] }
    }

    /// Present chunks only, in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (Vec<usize>, ChunkRef<'_>)> + '_ {
        self.iter().filter_map(|(coord, chunk)| chunk.map(|c| (coord, c)))
    }

    pub fn present_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.at(i).is_some()).count()
    }

    /// Sum of the lengths of all present chunks, saturating at `u64::MAX`.
    pub fn nbytes(&self) -> u64 {
        (0..self.len()).filter_map(|i| self.at(i)).fold(0u64, |n, c| n.saturating_add(c.length))
    }

    /// Parse the JSON form `{"shape": [..], "chunks": {"0.1": {..}}}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: ManifestDoc = serde_json::from_slice(bytes)?;
        let ndim = doc.shape.len();
        let n = grid_len(&doc.shape)?;
        let mut paths = vec![String::new(); n];
        let mut offsets = vec![0i64; n];
        let mut lengths = vec![0i64; n];
        for (key, entry) in doc.chunks {
            let coord = parse_chunk_key(&key, ndim)?;
            let i = flat_index(&doc.shape, &coord)?;
            paths[i] = entry.path;
            offsets[i] = entry.offset;
            lengths[i] = entry.length;
        }
        let shape = doc.shape;
        Self::from_signed(
            shape.clone(),
            ChunkArray::new(shape.clone(), paths)?,
            ChunkArray::new(shape.clone(), offsets)?,
            ChunkArray::new(shape, lengths)?,
        )
    }

    /// JSON form with present chunks only.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let chunks: BTreeMap<String, ChunkEntry> =
            self.entries().map(|(coord, c)| (format_chunk_key(&coord), c.to_entry())).collect();
        let doc = ManifestDocOut { shape: &self.shape, chunks };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    fn at(&self, i: usize) -> Option<ChunkRef<'_>> {
        let (path, offset, length) = (self.paths[i].as_str(), self.offsets[i], self.lengths[i]);
        if is_sentinel(path, offset, length) {
            None
        } else {
            Some(ChunkRef { path, offset, length })
        }
    }
}

impl<'a> IntoIterator for &'a ChunkManifest {
    type Item = (Vec<usize>, Option<ChunkRef<'a>>);
    type IntoIter = ChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major walk over a manifest's chunk grid.
pub struct ChunkIter<'a> {
    manifest: &'a ChunkManifest,
    next: usize,
    coord: Vec<usize>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = (Vec<usize>, Option<ChunkRef<'a>>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.manifest.len() {
            return None;
        }
        let item = (self.coord.clone(), self.manifest.at(self.next));
        self.next += 1;
        // odometer step, last dimension fastest
        for d in (0..self.coord.len()).rev() {
            self.coord[d] += 1;
            if self.coord[d] < self.manifest.shape[d] {
                break;
            }
            self.coord[d] = 0;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.manifest.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkIter<'_> {}

/// Row-major flat offset of `coord` within `shape`.
pub fn flat_index(shape: &[usize], coord: &[usize]) -> Result<usize> {
    if coord.len() != shape.len() {
        return Err(Error::RankMismatch { expected: shape.len(), found: coord.len() });
    }
    let mut i = 0usize;
    for (&c, &n) in coord.iter().zip(shape) {
        if c >= n {
            return Err(Error::IndexOutOfRange { coord: coord.to_vec(), shape: shape.to_vec() });
        }
        i = i
            .checked_mul(n)
            .and_then(|i| i.checked_add(c))
            .ok_or_else(|| Error::GridTooLarge { shape: shape.to_vec() })?;
    }
    Ok(i)
}

/// Number of coordinates in a grid of `shape`, or [`Error::GridTooLarge`]
/// when one record per coordinate could not be addressed in memory.
pub fn grid_len(shape: &[usize]) -> Result<usize> {
    if shape.contains(&0) {
        return Ok(0);
    }
    let record = std::mem::size_of::<String>() + 2 * std::mem::size_of::<u64>();
    shape
        .iter()
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .filter(|&n| n.checked_mul(record).is_some_and(|bytes| bytes <= isize::MAX as usize))
        .ok_or_else(|| Error::GridTooLarge { shape: shape.to_vec() })
}

/// `.`-separated chunk key used by the JSON form, e.g. `"0.1.2"`.
/// Zero-dimensional grids use `"0"`.
pub fn format_chunk_key(coord: &[usize]) -> String {
    if coord.is_empty() {
        return "0".to_string();
    }
    coord.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(".")
}

pub fn parse_chunk_key(key: &str, ndim: usize) -> Result<Vec<usize>> {
    let bad = || Error::InvalidChunkKey { key: key.to_string() };
    if ndim == 0 {
        return if key == "0" || key.is_empty() { Ok(vec![]) } else { Err(bad()) };
    }
    let coord = key
        .split('.')
        .map(|p| p.parse::<usize>().map_err(|_| bad()))
        .collect::<Result<Vec<_>>>()?;
    if coord.len() != ndim {
        return Err(bad());
    }
    Ok(coord)
}

fn check_field_shape(field: &'static str, expected: &[usize], found: &[usize]) -> Result<()> {
    if expected != found {
        return Err(Error::ShapeMismatch {
            field,
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

fn to_unsigned(field: &'static str, values: &[i64]) -> Result<Vec<u64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            u64::try_from(value).map_err(|_| Error::InvalidEntry { field, index, value })
        })
        .collect()
}

#[derive(Deserialize)]
struct ManifestDoc {
    shape: Vec<usize>,
    #[serde(default)]
    chunks: BTreeMap<String, DocEntry>,
}

#[derive(Serialize)]
struct ManifestDocOut<'a> {
    shape: &'a [usize],
    chunks: BTreeMap<String, ChunkEntry>,
}

#[derive(Deserialize)]
struct DocEntry {
    path: String,
    offset: i64,
    length: i64,
}

impl fmt::Display for ChunkRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{}]", self.path, self.offset, self.offset.saturating_add(self.length))
    }
}
