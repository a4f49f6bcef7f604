use std::sync::{Arc, Mutex};

use serde_json::json;
use vref_core::backend::{Backend, ByteRangeRead};
use vref_core::options::{ReaderOptions, StorageOptions};
use vref_core::{BoxError, Error, PathClass, Resolver};

fn write_sample(dir: &std::path::Path) -> std::path::PathBuf {
    let p = dir.join("dataset.bin");
    let data: Vec<u8> = (0..=255u8).collect();
    std::fs::write(&p, data).unwrap();
    p
}

#[test]
fn opens_local_path_and_reads_ranges() {
    let td = tempfile::tempdir().unwrap();
    let p = write_sample(td.path());
    let r = Resolver::new();
    let mut h = r.resolve(p.to_str().unwrap(), &ReaderOptions::default()).unwrap();
    assert_eq!(h.class(), &PathClass::Local);
    assert_eq!(h.protocol(), "file");
    assert_eq!(h.size(), 256);
    assert_eq!(h.read_range(10, 4).unwrap(), vec![10, 11, 12, 13]);
    assert_eq!(h.read_range(250, 6).unwrap(), vec![250, 251, 252, 253, 254, 255]);
    assert!(h.read_range(256, 0).unwrap().is_empty());
    h.close().unwrap();
}

#[test]
fn opens_file_urls() {
    let td = tempfile::tempdir().unwrap();
    let p = write_sample(td.path());
    let url = format!("file://{}", p.to_str().unwrap());
    let mut h = Resolver::new().resolve(&url, &ReaderOptions::default()).unwrap();
    assert_eq!(h.protocol(), "file");
    assert_eq!(h.read_range(0, 2).unwrap(), vec![0, 1]);
}

#[test]
fn reads_past_end_fail_with_context() {
    let td = tempfile::tempdir().unwrap();
    let p = write_sample(td.path());
    let mut h = Resolver::new().resolve(p.to_str().unwrap(), &ReaderOptions::default()).unwrap();
    match h.read_range(200, 100) {
        Err(Error::Read { offset: 200, length: 100, .. }) => {}
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(h.read_range(u64::MAX, 2), Err(Error::Read { .. })));
}

#[test]
fn missing_local_file_is_an_open_error() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("missing.nc");
    let err = Resolver::new().resolve(p.to_str().unwrap(), &ReaderOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Open { ref protocol, .. } if protocol == "file"));
}

#[test]
fn unknown_protocol_is_unsupported() {
    let err = Resolver::new()
        .resolve("ftp://example.com/air.nc", &ReaderOptions::default())
        .unwrap_err();
    match err {
        Error::UnsupportedProtocol { protocol, path } => {
            assert_eq!(protocol, "ftp");
            assert_eq!(path, "ftp://example.com/air.nc");
        }
        other => panic!("unexpected {other:?}"),
    }
    let err = Resolver::empty().resolve("/tmp/air.nc", &ReaderOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedProtocol { .. }));
}

#[test]
fn memory_filesystem_round_trip() {
    let r = Resolver::new();
    r.memory().put("memory://dataset.nc", b"hello virtual world".to_vec()).unwrap();
    let mut h = r.resolve("memory://dataset.nc", &ReaderOptions::default()).unwrap();
    assert_eq!(h.protocol(), "memory");
    assert_eq!(h.class(), &PathClass::Local);
    assert_eq!(h.size(), 19);
    assert_eq!(h.read_range(6, 7).unwrap(), b"virtual".to_vec());
    h.close().unwrap();

    let clone = r.clone();
    let mut again = clone.resolve("memory:///dataset.nc", &ReaderOptions::default()).unwrap();
    assert_eq!(again.read_range(0, 5).unwrap(), b"hello".to_vec());
    assert!(r.resolve("memory://nope.nc", &ReaderOptions::default()).is_err());
}

struct CapturingBackend {
    seen: Arc<Mutex<Vec<(String, StorageOptions)>>>,
}

struct EmptyFile;

impl ByteRangeRead for EmptyFile {
    fn size(&self) -> u64 {
        0
    }
    fn read_range(&mut self, _offset: u64, _length: u64) -> Result<Vec<u8>, BoxError> {
        Ok(Vec::new())
    }
}

impl Backend for CapturingBackend {
    fn open(
        &self,
        path: &str,
        options: &StorageOptions,
    ) -> Result<Box<dyn ByteRangeRead>, BoxError> {
        self.seen.lock().unwrap().push((path.to_string(), options.clone()));
        Ok(Box::new(EmptyFile))
    }
}

#[test]
fn backends_receive_merged_options() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut r = Resolver::empty();
    r.register("s3", Arc::new(CapturingBackend { seen: seen.clone() }));
    r.register("https", Arc::new(CapturingBackend { seen: seen.clone() }));

    let caller = ReaderOptions::with_storage_options(
        json!({"anon": false, "region_name": "eu-west-1"}).as_object().unwrap().clone(),
    );
    let h = r.resolve("s3://bucket/air.nc", &caller).unwrap();
    assert_eq!(h.class(), &PathClass::Cloud { provider_prefix: "s3://".into() });
    r.resolve("https://example.com/air.nc", &ReaderOptions::default()).unwrap();
    r.resolve("s3a://bucket/air.nc", &ReaderOptions::default()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(
        serde_json::Value::Object(seen[0].1.clone()),
        json!({"key": "", "secret": "", "anon": false, "region_name": "eu-west-1"})
    );
    assert!(seen[1].1.is_empty());
    assert_eq!(seen[2].1["anon"], json!(true));
}
