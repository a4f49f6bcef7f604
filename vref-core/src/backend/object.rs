//! Object-store backends (S3, GCS, Azure, HTTP, in-memory) on top of the
//! `object_store` crate.
//!
//! `object_store` is async; every open handle owns a current-thread tokio
//! runtime and blocks on it, so callers stay synchronous.

use std::sync::Arc;

use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;
use url::Url;

use super::{checked_range, Backend, ByteRangeRead};
use crate::error::BoxError;
use crate::options::{option_string, StorageOptions};
use crate::path::protocol_of;

fn runtime() -> Result<Runtime, BoxError> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// Backend for `s3://`, `gs://`, `az://` and `http(s)://` paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectStoreBackend;

impl Backend for ObjectStoreBackend {
    fn open(
        &self,
        path: &str,
        options: &StorageOptions,
    ) -> Result<Box<dyn ByteRangeRead>, BoxError> {
        let protocol = protocol_of(path);
        let url = Url::parse(&canonical_url(path, &protocol))?;
        let opts = builder_options(&protocol, options);
        let (store, location) = object_store::parse_url_opts(&url, opts)?;
        let store: Arc<dyn ObjectStore> = Arc::from(store);
        let rt = runtime()?;
        let meta = rt.block_on(store.head(&location))?;
        debug!(%url, size = meta.size, "opened object");
        Ok(Box::new(ObjectFile { rt, store, location, size: meta.size as u64 }))
    }
}

/// `gcs://` is not understood by `object_store`; spell it `gs://`.
fn canonical_url(path: &str, protocol: &str) -> String {
    match path.split_once("://") {
        Some((scheme, rest)) if protocol == "gs" && !scheme.eq_ignore_ascii_case("gs") => {
            format!("gs://{rest}")
        }
        _ => path.to_string(),
    }
}

/// Translate storage options into `object_store` builder keys.
///
/// S3 accepts the familiar `key`/`secret`/`token`/`anon`/`endpoint_url`
/// spellings; empty credentials are dropped so anonymous access stays
/// anonymous. Other keys are passed through and unknown ones are ignored by
/// the builders.
pub fn builder_options(protocol: &str, options: &StorageOptions) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(options.len());
    for (k, v) in options {
        if v.is_null() {
            continue;
        }
        if protocol != "s3" {
            out.push((k.clone(), option_string(v)));
            continue;
        }
        let renamed = match k.as_str() {
            "anon" => {
                if matches!(v, Value::Bool(true)) || option_string(v) == "true" {
                    out.push(("skip_signature".to_string(), "true".to_string()));
                }
                continue;
            }
            "key" => "access_key_id",
            "secret" => "secret_access_key",
            "token" => "session_token",
            "endpoint_url" => "endpoint",
            "region_name" => "region",
            other => other,
        };
        let value = option_string(v);
        if value.is_empty() {
            continue;
        }
        out.push((renamed.to_string(), value));
    }
    out
}

struct ObjectFile {
    rt: Runtime,
    store: Arc<dyn ObjectStore>,
    location: ObjectPath,
    size: u64,
}

impl ByteRangeRead for ObjectFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>, BoxError> {
        let range = checked_range(offset, length, self.size)?;
        let bytes = self.rt.block_on(self.store.get_range(&self.location, range))?;
        Ok(bytes.to_vec())
    }
}

/// Process-local `memory://` filesystem shared by every handle opened
/// through the same backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    store: Arc<InMemory>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `path` (`memory://name` or a bare name).
    pub fn put(&self, path: &str, data: Vec<u8>) -> Result<(), BoxError> {
        let location = memory_location(path);
        runtime()?.block_on(self.store.put(&location, PutPayload::from(data)))?;
        Ok(())
    }
}

fn memory_location(path: &str) -> ObjectPath {
    let rest = match path.split_once("://") {
        Some((_, rest)) => rest,
        None => path,
    };
    ObjectPath::from(rest.trim_start_matches('/'))
}

impl Backend for MemoryBackend {
    fn open(
        &self,
        path: &str,
        _options: &StorageOptions,
    ) -> Result<Box<dyn ByteRangeRead>, BoxError> {
        let location = memory_location(path);
        let rt = runtime()?;
        let meta = rt.block_on(self.store.head(&location))?;
        let store: Arc<dyn ObjectStore> = self.store.clone();
        Ok(Box::new(ObjectFile { rt, store, location, size: meta.size as u64 }))
    }
}
