use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend-specific auth/connection parameters, ordered by key.
pub type StorageOptions = Map<String, Value>;

/// Options accepted by [`crate::resolve::Resolver::resolve`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ReaderOptions {
    #[serde(default)]
    pub storage_options: StorageOptions,
}

impl ReaderOptions {
    pub fn with_storage_options(storage_options: StorageOptions) -> Self {
        Self { storage_options }
    }
}

/// Defaults applied before caller options for the given protocol id.
/// S3 defaults to anonymous access.
pub fn protocol_defaults(protocol: &str) -> StorageOptions {
    match protocol {
        "s3" => {
            let mut m = StorageOptions::new();
            m.insert("key".into(), Value::from(""));
            m.insert("secret".into(), Value::from(""));
            m.insert("anon".into(), Value::Bool(true));
            m
        }
        _ => StorageOptions::new(),
    }
}

/// Shallow merge: every key of `overrides` replaces the same key of
/// `defaults`; nested objects are not merged.
pub fn merge_options(defaults: &StorageOptions, overrides: &StorageOptions) -> StorageOptions {
    let mut out = defaults.clone();
    for (k, v) in overrides {
        out.insert(k.clone(), v.clone());
    }
    out
}

/// Option value rendered as the plain string backends expect.
pub fn option_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
