use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use tracing::debug;
use url::Url;

use super::{checked_range, Backend, ByteRangeRead};
use crate::error::BoxError;
use crate::options::StorageOptions;

/// Local filesystem backend for plain paths and `file://` URLs.
/// Storage options are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalBackend;

impl LocalBackend {
    fn to_fs_path(path: &str) -> Result<PathBuf, BoxError> {
        if path.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("file://")) {
            let url = Url::parse(path)?;
            return url.to_file_path().map_err(|_| format!("not a local file URL: {path}").into());
        }
        Ok(PathBuf::from(path))
    }
}

impl Backend for LocalBackend {
    fn open(
        &self,
        path: &str,
        _options: &StorageOptions,
    ) -> Result<Box<dyn ByteRangeRead>, BoxError> {
        let fs_path = Self::to_fs_path(path)?;
        let file = File::open(&fs_path)?;
        let size = file.metadata()?.len();
        debug!(path = %fs_path.display(), size, "opened local file");
        Ok(Box::new(LocalFile { file, size }))
    }
}

struct LocalFile {
    file: File,
    size: u64,
}

impl ByteRangeRead for LocalFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>, BoxError> {
        let range = checked_range(offset, length, self.size)?;
        let mut buf = vec![0u8; range.len()];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
