use super::*;

#[test]
fn transient_failures_are_retryable() {
    assert!(ApiError::Timeout("slow".into()).retryable());
    assert!(ApiError::Connect("refused".into()).retryable());
    assert!(ApiError::Request("reset".into()).retryable());
    for status in [429, 502, 503, 504] {
        assert!(ApiError::Status { status, body: String::new() }.retryable(), "status {status}");
    }
}

#[test]
fn rejections_are_not_retryable() {
    for status in [400, 404, 422, 500] {
        assert!(!ApiError::Status { status, body: String::new() }.retryable(), "status {status}");
    }
    assert!(!ApiError::Parse("bad json".into()).retryable());
    assert!(!ApiError::Config("no url".into()).retryable());
    assert!(!ApiError::HttpClientBuild("tls".into()).retryable());
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(ApiError::Timeout(String::new()).error_code(), "E_TIMEOUT");
    assert_eq!(ApiError::Connect(String::new()).error_code(), "E_CONNECT");
    assert_eq!(ApiError::Request(String::new()).error_code(), "E_REQUEST");
    assert_eq!(ApiError::Status { status: 500, body: String::new() }.error_code(), "E_STATUS");
    assert_eq!(ApiError::Parse(String::new()).error_code(), "E_PARSE");
    assert_eq!(ApiError::Config(String::new()).error_code(), "E_CONFIG");
    assert_eq!(ApiError::HttpClientBuild(String::new()).error_code(), "E_HTTP_CLIENT_BUILD");
}

#[test]
fn status_display_includes_code() {
    let err = ApiError::Status { status: 503, body: "down".into() };
    assert_eq!(err.to_string(), "service returned status 503");
}
