use serde_json::{json, Value};
use vref_core::options::{merge_options, protocol_defaults, ReaderOptions, StorageOptions};
use vref_core::Resolver;

fn opts(v: Value) -> StorageOptions {
    match v {
        Value::Object(m) => m,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn s3_defaults_to_anonymous_access() {
    assert_eq!(protocol_defaults("s3"), opts(json!({"key": "", "secret": "", "anon": true})));
    assert!(protocol_defaults("file").is_empty());
    assert!(protocol_defaults("gs").is_empty());
    assert!(protocol_defaults("https").is_empty());
}

#[test]
fn caller_values_win_per_key() {
    let defaults = opts(json!({"key": "", "secret": "", "anon": true}));
    let caller = opts(json!({"anon": false, "key": "AKIA"}));
    let merged = merge_options(&defaults, &caller);
    assert_eq!(merged, opts(json!({"key": "AKIA", "secret": "", "anon": false})));
}

#[test]
fn merge_is_shallow() {
    let defaults = opts(json!({"client_kwargs": {"region_name": "us-east-1", "verify": true}}));
    let caller = opts(json!({"client_kwargs": {"region_name": "eu-west-1"}}));
    let merged = merge_options(&defaults, &caller);
    assert_eq!(merged["client_kwargs"], json!({"region_name": "eu-west-1"}));
}

#[test]
fn merge_leaves_inputs_untouched() {
    let defaults = opts(json!({"a": 1}));
    let caller = opts(json!({"b": 2}));
    let merged = merge_options(&defaults, &caller);
    assert_eq!(merged, opts(json!({"a": 1, "b": 2})));
    assert_eq!(defaults, opts(json!({"a": 1})));
    assert_eq!(caller, opts(json!({"b": 2})));
}

#[test]
fn effective_options_follow_protocol() {
    let ro =
        ReaderOptions::with_storage_options(opts(json!({"endpoint_url": "http://minio:9000"})));
    let s3 = Resolver::effective_options("s3://bucket/air.nc", &ro);
    assert_eq!(s3["anon"], json!(true));
    assert_eq!(s3["endpoint_url"], json!("http://minio:9000"));
    let local = Resolver::effective_options("/tmp/air.nc", &ro);
    assert_eq!(local, opts(json!({"endpoint_url": "http://minio:9000"})));
}

#[test]
fn reader_options_parse_from_json() {
    let ro: ReaderOptions =
        serde_json::from_str(r#"{"storage_options": {"anon": false, "region_name": "us-west-2"}}"#)
            .unwrap();
    assert_eq!(ro.storage_options["region_name"], json!("us-west-2"));
    let empty: ReaderOptions = serde_json::from_str("{}").unwrap();
    assert!(empty.storage_options.is_empty());
}
