use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn empty_lookup_gives_defaults() {
    let cfg = ApiConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, ApiConfig::default());
    assert_eq!(cfg.debounce(), Duration::from_millis(300));
}

#[test]
fn overrides_are_parsed() {
    let cfg = ApiConfig::from_lookup(lookup_from(&[
        ("STACKBOARD_API_URL", "https://api.example.test/"),
        ("STACKBOARD_REQUEST_TIMEOUT_SECS", "5"),
        ("STACKBOARD_CONNECT_TIMEOUT_SECS", "2"),
        ("STACKBOARD_RETRY_ATTEMPTS", "1"),
        ("STACKBOARD_RETRY_BASE_MS", "10"),
        ("STACKBOARD_VALIDATE_DEBOUNCE_MS", "50"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://api.example.test");
    assert_eq!(cfg.timeouts, ApiTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.retry, RetryPolicy { attempts: 1, base_ms: 10 });
    assert_eq!(cfg.debounce_ms, 50);
}

#[test]
fn garbage_numbers_fall_back() {
    let cfg = ApiConfig::from_lookup(lookup_from(&[
        ("STACKBOARD_REQUEST_TIMEOUT_SECS", "soon"),
        ("STACKBOARD_RETRY_ATTEMPTS", "-1"),
    ]))
    .unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(cfg.retry.attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn unusable_values_are_config_errors() {
    let bad_url = ApiConfig::from_lookup(lookup_from(&[("STACKBOARD_API_URL", "localhost:8000")]));
    assert!(matches!(bad_url, Err(ApiError::Config(_))));

    let zero_attempts = ApiConfig::from_lookup(lookup_from(&[("STACKBOARD_RETRY_ATTEMPTS", "0")]));
    assert!(matches!(zero_attempts, Err(ApiError::Config(_))));

    let zero_timeout = ApiConfig::from_lookup(lookup_from(&[("STACKBOARD_REQUEST_TIMEOUT_SECS", "0")]));
    assert!(matches!(zero_timeout, Err(ApiError::Config(_))));
}

#[test]
fn url_joins_paths() {
    let cfg = ApiConfig::default();
    assert_eq!(cfg.url("/api/v1/graph/validate"), "http://127.0.0.1:8000/api/v1/graph/validate");
    assert_eq!(cfg.url("api/v1/registry/services"), "http://127.0.0.1:8000/api/v1/registry/services");
}

#[test]
fn from_env_reads_process_environment() {
    // Only test in this crate that touches the process environment.
    unsafe {
        std::env::set_var("STACKBOARD_API_URL", "http://10.1.2.3:9000");
        std::env::set_var("STACKBOARD_VALIDATE_DEBOUNCE_MS", "120");
    }
    let cfg = ApiConfig::from_env().unwrap();
    unsafe {
        std::env::remove_var("STACKBOARD_API_URL");
        std::env::remove_var("STACKBOARD_VALIDATE_DEBOUNCE_MS");
    }
    assert_eq!(cfg.base_url, "http://10.1.2.3:9000");
    assert_eq!(cfg.debounce_ms, 120);
}
