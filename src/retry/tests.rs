use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Error)]
enum TestError {
    #[error("transient")]
    Transient,
    #[error("permanent")]
    Permanent,
}

impl Retryable for TestError {
    fn is_retryable(&self) -> bool {
        matches!(self, TestError::Transient)
    }
}

#[test]
fn test_default_policy_values() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.base_delay, Duration::from_secs(1));
    assert!((policy.multiplier - 1.5).abs() < f64::EPSILON);
}

#[test]
fn test_delay_grows_exponentially() {
    let policy = RetryPolicy::new(5, Duration::from_millis(1000), 1.5);
    assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(1500));
    assert_eq!(policy.delay_for(3), Duration::from_millis(2250));
}

#[test]
fn test_multiplier_below_one_does_not_shrink_delay() {
    let policy = RetryPolicy::new(3, Duration::from_millis(100), 0.5);
    assert_eq!(policy.delay_for(3), Duration::from_millis(100));
}

#[tokio::test]
async fn test_succeeds_first_try() {
    let calls = AtomicU32::new(0);
    let result: Result<u32, RetryError<TestError>> = RetryPolicy::immediate(3)
        .run("test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;

    assert_eq!(result.expect("ok"), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let result: Result<u32, RetryError<TestError>> = RetryPolicy::immediate(3)
        .run("test", |attempt| async move {
            if attempt < 3 {
                Err(TestError::Transient)
            } else {
                Ok(attempt)
            }
        })
        .await;

    assert_eq!(result.expect("ok"), 3);
}

#[tokio::test]
async fn test_exhausts_at_ceiling() {
    let calls = AtomicU32::new(0);
    let result: Result<(), RetryError<TestError>> = RetryPolicy::immediate(3)
        .run("test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Transient) }
        })
        .await;

    let err = result.expect_err("should exhaust");
    assert!(err.is_exhausted());
    assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_permanent_error_aborts_immediately() {
    let calls = AtomicU32::new(0);
    let result: Result<(), RetryError<TestError>> = RetryPolicy::immediate(5)
        .run("test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Permanent) }
        })
        .await;

    let err = result.expect_err("should abort");
    assert!(!err.is_exhausted());
    assert!(matches!(err.into_inner(), TestError::Permanent));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_attempts_still_calls_once() {
    let calls = AtomicU32::new(0);
    let _ = RetryPolicy::immediate(0)
        .run("test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(TestError::Transient) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_waits_between_attempts() {
    let start = tokio::time::Instant::now();
    let policy = RetryPolicy::new(3, Duration::from_millis(1000), 1.5);

    let _: Result<(), RetryError<TestError>> = policy
        .run("test", |_| async { Err(TestError::Transient) })
        .await;

    assert!(start.elapsed() >= Duration::from_millis(2500));
}
