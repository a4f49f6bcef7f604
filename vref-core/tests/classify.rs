use proptest::prelude::*;
use vref_core::path::{classify, protocol_of, PathClass};

fn cloud(prefix: &str) -> PathClass {
    PathClass::Cloud { provider_prefix: prefix.to_string() }
}

#[test]
fn classifies_known_path_kinds() {
    assert_eq!(classify("s3://bucket/air.nc"), cloud("s3://"));
    assert_eq!(classify("gs://bucket/air.nc"), cloud("gs://"));
    assert_eq!(classify("az://container/air.nc"), cloud("az://"));
    assert_eq!(classify("https://example.com/air.nc"), PathClass::Http);
    assert_eq!(classify("http://localhost:8080/air.nc"), PathClass::Http);
    assert_eq!(classify("/home/user/air.nc"), PathClass::Local);
    assert_eq!(classify("relative/air.nc"), PathClass::Local);
    assert_eq!(classify("file:///tmp/air.nc"), PathClass::Local);
}

#[test]
fn scheme_matching_ignores_case() {
    assert_eq!(classify("HTTPS://example.com/a.nc"), PathClass::Http);
    assert_eq!(classify("HtTp://example.com/a.nc"), PathClass::Http);
    assert_eq!(classify("S3://bucket/a.nc"), cloud("s3://"));
    assert_eq!(classify("GS://bucket/a.nc"), cloud("gs://"));
}

#[test]
fn malformed_or_ambiguous_input_is_local() {
    let inputs =
        ["", "://", "s3:/bucket/key", "s3:bucket", "C:\\data\\air.nc", "c://data", "3s://x", "%%%"];
    for p in inputs {
        assert_eq!(classify(p), PathClass::Local, "{p:?}");
    }
}

#[test]
fn http_scheme_alone_decides() {
    for p in ["http://", "HTTP://", "https://exa mple.com/a.nc", "http://[::1/a", "http:air.nc"] {
        assert_eq!(classify(p), PathClass::Http, "{p:?}");
        assert!(matches!(protocol_of(p).as_str(), "http" | "https"), "{p:?}");
    }
}

#[test]
fn http_wins_over_cloud_looking_paths() {
    assert_eq!(classify("https://s3.amazonaws.com/bucket/s3://key"), PathClass::Http);
}

#[test]
fn protocol_ids() {
    assert_eq!(protocol_of("/tmp/a.nc"), "file");
    assert_eq!(protocol_of("file:///tmp/a.nc"), "file");
    assert_eq!(protocol_of("s3://b/k"), "s3");
    assert_eq!(protocol_of("S3A://b/k"), "s3");
    assert_eq!(protocol_of("gcs://b/k"), "gs");
    assert_eq!(protocol_of("abfs://c/k"), "az");
    assert_eq!(protocol_of("https://h/k"), "https");
    assert_eq!(protocol_of("memory://dataset.nc"), "memory");
    assert_eq!(protocol_of("ftp://h/k"), "ftp");
}

proptest! {
    #[test]
    fn classify_is_total_and_deterministic(s in ".*") {
        let a = classify(&s);
        let b = classify(&s);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn any_http_url_is_http(
        scheme in "(?i)https?",
        host in "[a-z][a-z0-9]{0,10}",
        rest in "[a-zA-Z0-9/._-]{0,30}",
    ) {
        let p = format!("{scheme}://{host}/{rest}");
        prop_assert_eq!(classify(&p), PathClass::Http);
    }

    #[test]
    fn cloud_prefix_is_reported(
        prefix in prop::sample::select(vec!["s3://", "gs://", "az://"]),
        rest in "[a-z0-9][a-z0-9/._-]{0,30}",
    ) {
        let p = format!("{prefix}{rest}");
        prop_assert_eq!(classify(&p), PathClass::Cloud { provider_prefix: prefix.to_string() });
    }

    #[test]
    fn http_class_agrees_with_protocol(s in ".*") {
        let is_http = classify(&s) == PathClass::Http;
        let protocol = protocol_of(&s);
        prop_assert_eq!(is_http, protocol == "http" || protocol == "https");
    }

    #[test]
    fn plain_paths_are_local(p in "[a-zA-Z0-9/._ -]{0,40}") {
        prop_assert_eq!(classify(&p), PathClass::Local);
    }
}
