use std::fmt;

use serde::{Deserialize, Serialize};

/// Cloud providers recognised by [`classify`], as `scheme://` prefixes.
pub const CLOUD_PREFIXES: &[&str] = &["s3://", "gs://", "az://"];

/// How a path string has to be opened.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PathClass {
    Local,
    Cloud { provider_prefix: String },
    Http,
}

impl fmt::Display for PathClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathClass::Local => f.write_str("local"),
            PathClass::Cloud { provider_prefix } => write!(f, "cloud({provider_prefix})"),
            PathClass::Http => f.write_str("http"),
        }
    }
}

/// Classify `path` as local, cloud object or http(s). Pure and total:
/// anything that is not recognisably remote is `Local`.
///
/// An `http:`/`https:` scheme is enough for `Http`; the rest of the string
/// is not parsed, so `"http://"` and URLs with invalid hosts are still http.
pub fn classify(path: &str) -> PathClass {
    if http_scheme(path).is_some() {
        return PathClass::Http;
    }
    if let Some(scheme) = explicit_scheme(path) {
        for prefix in CLOUD_PREFIXES {
            if prefix.strip_suffix("://") == Some(scheme.as_str()) {
                return PathClass::Cloud { provider_prefix: (*prefix).to_string() };
            }
        }
    }
    PathClass::Local
}

/// Protocol identifier selecting the I/O backend for `path`.
///
/// Paths without a `scheme://` prefix are `"file"`, except `http:`/`https:`
/// which always name their own protocol. Scheme aliases are folded onto the
/// backend they share (`s3a` -> `s3`, `gcs` -> `gs`, `abfs` -> `az`).
pub fn protocol_of(path: &str) -> String {
    let Some(scheme) = http_scheme(path).or_else(|| explicit_scheme(path)) else {
        return "file".to_string();
    };
    match scheme.as_str() {
        "s3a" => "s3".to_string(),
        "gcs" => "gs".to_string(),
        "abfs" | "abfss" | "adl" | "azure" => "az".to_string(),
        _ => scheme,
    }
}

/// Lower-cased scheme of a leading `scheme:`, with or without `//`.
fn scheme(path: &str) -> Option<String> {
    let (scheme, _) = path.split_once(':')?;
    let mut chars = scheme.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}

fn http_scheme(path: &str) -> Option<String> {
    scheme(path).filter(|s| s == "http" || s == "https")
}

/// Scheme of a leading `scheme://`. Single-letter schemes are treated as
/// Windows drive letters.
fn explicit_scheme(path: &str) -> Option<String> {
    let scheme = scheme(path)?;
    if scheme.len() < 2 || !path.get(scheme.len() + 1..)?.starts_with("//") {
        return None;
    }
    Some(scheme)
}
