use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::time::Instant;

use super::*;

fn failing_then_ok(failures: usize, err: fn() -> ApiError) -> (Arc<AtomicUsize>, impl FnMut() -> std::future::Ready<Result<u32, ApiError>>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let op = move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(if n < failures { Err(err()) } else { Ok(7) })
    };
    (calls, op)
}

#[test]
fn delay_doubles_from_base() {
    let policy = RetryPolicy { attempts: 5, base_ms: 100 };
    assert_eq!(policy.delay(1), Duration::from_millis(100));
    assert_eq!(policy.delay(2), Duration::from_millis(200));
    assert_eq!(policy.delay(3), Duration::from_millis(400));
}

#[test]
fn delay_is_capped() {
    let policy = RetryPolicy { attempts: 100, base_ms: 1 };
    assert_eq!(policy.delay(50), Duration::from_millis(1 << MAX_BACKOFF_SHIFT));
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success() {
    let policy = RetryPolicy { attempts: 3, base_ms: 100 };
    let (calls, op) = failing_then_ok(2, || ApiError::Connect("refused".into()));
    let started = Instant::now();
    let result = policy.run("validate", op).await;
    assert_eq!(result.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn attempts_are_bounded() {
    let policy = RetryPolicy { attempts: 3, base_ms: 10 };
    let (calls, op) = failing_then_ok(10, || ApiError::Timeout("slow".into()));
    let result = policy.run("estimate", op).await;
    assert!(matches!(result, Err(ApiError::Timeout(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn rejections_are_not_retried() {
    let policy = RetryPolicy { attempts: 3, base_ms: 10 };
    let (calls, op) = failing_then_ok(10, || ApiError::Status { status: 422, body: "bad graph".into() });
    let result = policy.run("generate", op).await;
    assert!(matches!(result, Err(ApiError::Status { status: 422, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn once_never_sleeps() {
    let (calls, op) = failing_then_ok(1, || ApiError::Status { status: 503, body: String::new() });
    let started = Instant::now();
    assert!(RetryPolicy::once().run("services", op).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}
