//! Quota admission under concurrency and across dates.

use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use textgate_kernel::{Operation, PlatformError, UsageField, UsageKey, UsageStore};
use textgate_testing::harness::{summarize_request, TestPlatform};

#[tokio::test]
async fn test_concurrent_requests_admit_exactly_the_limit() {
    let platform = TestPlatform::builder().daily_limit(3).build().await.unwrap();

    let tasks = (0..8).map(|_| {
        let orchestrator = platform.orchestrator.clone();
        tokio::spawn(async move { orchestrator.execute(summarize_request()).await })
    });
    let outcomes = join_all(tasks).await;

    let mut admitted = 0;
    let mut denied = 0;
    for outcome in outcomes {
        match outcome.unwrap() {
            Ok(_) => admitted += 1,
            Err(PlatformError::QuotaExceeded { used, limit, .. }) => {
                assert_eq!((used, limit), (3, 3));
                denied += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 3);
    assert_eq!(denied, 5);

    // Only admitted requests ever reached the backend.
    assert_eq!(platform.backend.generate_count(), 3);

    let usage = platform
        .orchestrator
        .limits()
        .usage_snapshot(Some(Operation::Summarize))
        .await
        .unwrap();
    assert_eq!(usage[0].request_count, 3);
    assert_eq!(usage[0].remaining, 0);
}

#[tokio::test]
async fn test_denied_request_does_not_touch_the_backend() {
    let platform = TestPlatform::builder().daily_limit(0).build().await.unwrap();

    let err = platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::QuotaExceeded { .. }));
    assert_eq!(platform.backend.generate_count(), 0);
    assert_eq!(platform.backend.load_count("qwen-summarize"), 0);
}

#[tokio::test]
async fn test_lowering_limit_to_zero_denies_immediately() {
    let platform = TestPlatform::new().await.unwrap();
    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();

    platform
        .orchestrator
        .limits()
        .update_limit(Operation::Summarize, 0)
        .await
        .unwrap();

    let err = platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::QuotaExceeded { limit: 0, .. }));
}

#[tokio::test]
async fn test_exhausted_yesterday_does_not_affect_today() {
    let platform = TestPlatform::builder().daily_limit(2).build().await.unwrap();

    // Fill yesterday's counters to the brim, straight through the store.
    let yesterday = (Utc::now() - ChronoDuration::days(1)).date_naive();
    let key = UsageKey::new(Operation::Summarize, yesterday);
    platform
        .store
        .add(&key, UsageField::Requests, 2)
        .await
        .unwrap();

    // A new day is a new key; today's quota is untouched.
    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();

    let usage = platform
        .orchestrator
        .limits()
        .usage_snapshot(Some(Operation::Summarize))
        .await
        .unwrap();
    assert_eq!(usage[0].request_count, 1);
    assert_eq!(usage[0].remaining, 1);
}

#[tokio::test]
async fn test_operations_have_independent_quotas() {
    let platform = TestPlatform::builder().daily_limit(1).build().await.unwrap();

    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();
    let err = platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::QuotaExceeded { .. }));

    // Translate has its own counter and is still admitted.
    platform
        .orchestrator
        .execute(textgate_testing::harness::translate_request())
        .await
        .unwrap();
}
