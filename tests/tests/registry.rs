//! Model lifecycle: exactly-once loading, failure recovery, health.

use futures::future::join_all;
use textgate_engine::HealthStatus;
use textgate_kernel::{Operation, PlatformError};
use textgate_testing::harness::{summarize_request, translate_request, TestPlatform};

#[tokio::test]
async fn test_concurrent_requests_load_the_model_once() {
    let platform = TestPlatform::new().await.unwrap();

    let tasks = (0..8).map(|_| {
        let orchestrator = platform.orchestrator.clone();
        tokio::spawn(async move { orchestrator.execute(summarize_request()).await })
    });
    for outcome in join_all(tasks).await {
        outcome.unwrap().unwrap();
    }

    assert_eq!(platform.backend.load_count("qwen-summarize"), 1);
    assert_eq!(platform.backend.generate_count(), 8);
}

#[tokio::test]
async fn test_failed_load_is_not_cached() {
    let platform = TestPlatform::builder().daily_limit(5).build().await.unwrap();
    platform.backend.fail_load("qwen-summarize", "corrupt weights");

    let err = platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::ModelUnavailable { .. }));

    // The failed attempt consumed no quota.
    let usage = platform
        .orchestrator
        .limits()
        .usage_snapshot(Some(Operation::Summarize))
        .await
        .unwrap();
    assert_eq!(usage[0].request_count, 0);

    // Once the weights are fixed, the next request loads fresh.
    platform.backend.clear_load_failure("qwen-summarize");
    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();
    assert_eq!(platform.backend.load_count("qwen-summarize"), 2);
}

#[tokio::test]
async fn test_models_load_lazily_per_operation() {
    let platform = TestPlatform::new().await.unwrap();

    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();
    assert_eq!(platform.backend.load_count("qwen-summarize"), 1);
    assert_eq!(platform.backend.load_count("qwen-translate"), 0);

    platform
        .orchestrator
        .execute(translate_request())
        .await
        .unwrap();
    assert_eq!(platform.backend.load_count("qwen-translate"), 1);
}

#[tokio::test]
async fn test_eager_load_brings_every_model_up() {
    let platform = TestPlatform::builder().eager_load().build().await.unwrap();

    for model in textgate_testing::harness::DEFAULT_MODELS {
        assert_eq!(platform.backend.load_count(model), 1, "{model} not loaded");
    }
    assert_eq!(platform.orchestrator.health().status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_eager_load_failure_aborts_startup() {
    let result = TestPlatform::builder()
        .eager_load()
        .fail_load("qwen-translate", "unsupported tensor layout")
        .build()
        .await;
    assert!(matches!(result, Err(PlatformError::Configuration(_))));
}

#[tokio::test]
async fn test_health_degrades_until_models_are_loaded() {
    let platform = TestPlatform::new().await.unwrap();

    let report = platform.orchestrator.health();
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.models.len(), 3);
    assert!(report.models.iter().all(|m| !m.loaded));

    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();
    let report = platform.orchestrator.health();
    let summarize = report
        .models
        .iter()
        .find(|m| m.operation == Operation::Summarize)
        .unwrap();
    assert!(summarize.loaded);
    // Other operations are still lazy, so overall status stays degraded.
    assert_eq!(report.status, HealthStatus::Degraded);
}
