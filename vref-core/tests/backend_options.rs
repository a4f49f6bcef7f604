use serde_json::json;
use vref_core::backend::object::builder_options;
use vref_core::options::{merge_options, protocol_defaults};

fn pairs(v: &[(&str, &str)]) -> Vec<(String, String)> {
    v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn anonymous_s3_defaults_skip_signing() {
    let opts = protocol_defaults("s3");
    assert_eq!(builder_options("s3", &opts), pairs(&[("skip_signature", "true")]));
}

#[test]
fn s3_credentials_are_renamed() {
    let caller = json!({
        "anon": false,
        "key": "AKIA",
        "secret": "shh",
        "endpoint_url": "http://localhost:9000",
        "region": "us-west-2",
        "token": null
    });
    let merged = merge_options(&protocol_defaults("s3"), caller.as_object().unwrap());
    let mut got = builder_options("s3", &merged);
    got.sort();
    assert_eq!(
        got,
        pairs(&[
            ("access_key_id", "AKIA"),
            ("endpoint", "http://localhost:9000"),
            ("region", "us-west-2"),
            ("secret_access_key", "shh"),
        ])
    );
}

#[test]
fn other_protocols_pass_options_through() {
    let opts = json!({"service_account_path": "/etc/sa.json", "timeout": 30});
    let mut got = builder_options("gs", opts.as_object().unwrap());
    got.sort();
    assert_eq!(got, pairs(&[("service_account_path", "/etc/sa.json"), ("timeout", "30")]));
}
