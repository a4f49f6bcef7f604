use thiserror::Error;

/// Error type reported by store and backend collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no backend registered for protocol {protocol:?} (path {path:?})")]
    UnsupportedProtocol { protocol: String, path: String },

    #[error("chunk coordinate {coord:?} out of range for chunk grid {shape:?}")]
    IndexOutOfRange { coord: Vec<usize>, shape: Vec<usize> },

    #[error("chunk coordinate has {found} dimensions, chunk grid has {expected}")]
    RankMismatch { expected: usize, found: usize },

    #[error("{field} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch { field: &'static str, expected: Vec<usize>, found: Vec<usize> },

    #[error("chunk grid {shape:?} has more chunks than can be addressed")]
    GridTooLarge { shape: Vec<usize> },

    #[error("{field}[{index}] is negative ({value})")]
    InvalidEntry { field: &'static str, index: usize, value: i64 },

    #[error("invalid chunk key {key:?}")]
    InvalidChunkKey { key: String },

    #[error("store rejected reference {key:?} for chunk {coord:?}")]
    StoreRejected {
        coord: Vec<usize>,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("open {path:?} via {protocol}")]
    Open {
        path: String,
        protocol: String,
        #[source]
        source: BoxError,
    },

    #[error("read {length} bytes at offset {offset} from {path:?}")]
    Read {
        path: String,
        offset: u64,
        length: u64,
        #[source]
        source: BoxError,
    },

    #[error("close {path:?}")]
    Close {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
