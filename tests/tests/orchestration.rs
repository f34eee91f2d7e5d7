//! End-to-end request lifecycle: outputs, rollback on failure, deadlines.

use std::time::Duration;
use textgate_kernel::{
    InferenceFailure, Operation, OperationOutput, PlatformError,
};
use textgate_testing::harness::{classify_request, summarize_request, TestPlatform};

async fn request_count(platform: &TestPlatform, operation: Operation) -> u64 {
    platform
        .orchestrator
        .limits()
        .usage_snapshot(Some(operation))
        .await
        .unwrap()[0]
        .request_count
}

#[tokio::test]
async fn test_successful_request_commits_usage_and_metadata() {
    let platform = TestPlatform::new().await.unwrap();
    platform
        .backend
        .set_fallback_response("Revenue grew. Margins held.");

    let request = summarize_request().with_correlation_id("batch-7");
    let response = platform.orchestrator.execute(request).await.unwrap();

    assert_eq!(response.meta.operation, Operation::Summarize);
    assert_eq!(response.meta.model_used, "qwen-summarize");
    assert_eq!(response.meta.correlation_id.as_deref(), Some("batch-7"));
    assert_eq!(response.meta.output_tokens, 4);
    match response.output {
        OperationOutput::Summarize {
            summary,
            sentence_count,
        } => {
            assert_eq!(summary, "Revenue grew. Margins held.");
            assert_eq!(sentence_count, 2);
        }
        other => panic!("expected summarize output, got {other:?}"),
    }

    let usage = platform
        .orchestrator
        .limits()
        .usage_snapshot(Some(Operation::Summarize))
        .await
        .unwrap();
    assert_eq!(usage[0].request_count, 1);
    assert_eq!(usage[0].total_tokens, 4);
}

#[tokio::test]
async fn test_classification_parses_scripted_model_output() {
    let platform = TestPlatform::new().await.unwrap();
    platform.backend.add_mock_response(
        "CLASSIFICATION:",
        r#"{"label": "billing", "confidence": 0.92}"#,
    );

    let response = platform
        .orchestrator
        .execute(classify_request(&["billing", "support", "sales"]))
        .await
        .unwrap();
    match response.output {
        OperationOutput::Classify {
            label,
            confidence,
            scores,
        } => {
            assert_eq!(label, "billing");
            assert!((confidence - 0.92).abs() < 1e-9);
            assert_eq!(scores.len(), 3);
            let total: f64 = scores.values().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
        other => panic!("expected classify output, got {other:?}"),
    }
}

#[tokio::test]
async fn test_inference_failure_rolls_the_reservation_back() {
    let platform = TestPlatform::builder().daily_limit(1).build().await.unwrap();
    platform.backend.fail_generation("kv cache allocation failed");

    let err = platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlatformError::Inference(InferenceFailure::Runtime(_))
    ));
    assert_eq!(request_count(&platform, Operation::Summarize).await, 0);

    // The slot freed by the rollback admits the retry.
    platform.backend.clear_generation_failure();
    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();
    assert_eq!(request_count(&platform, Operation::Summarize).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_inference_timeout_rolls_back_and_reports_deadline() {
    let platform = TestPlatform::builder()
        .inference_timeout(Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    platform
        .backend
        .set_generate_delay(Duration::from_secs(30));

    let err = platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap_err();
    match err {
        PlatformError::Inference(InferenceFailure::Timeout(deadline)) => {
            assert_eq!(deadline, Duration::from_secs(2));
        }
        other => panic!("expected timeout, got {other}"),
    }
    assert_eq!(request_count(&platform, Operation::Summarize).await, 0);
}

#[tokio::test]
async fn test_cancelled_request_rolls_the_reservation_back() {
    let platform = TestPlatform::builder()
        .daily_limit(1)
        .inference_timeout(Duration::from_secs(60))
        .build()
        .await
        .unwrap();
    platform
        .backend
        .set_generate_delay(Duration::from_secs(30));

    let orchestrator = platform.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.execute(summarize_request()).await });

    // Wait until the request is inside the backend, then abandon it.
    while platform.backend.generate_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(request_count(&platform, Operation::Summarize).await, 1);
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    // The abandoned reservation is credited back asynchronously.
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while request_count(&platform, Operation::Summarize).await != 0 {
        assert!(
            std::time::Instant::now() < deadline,
            "reservation was never rolled back"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // The freed slot admits a fresh request.
    platform.backend.set_generate_delay(Duration::ZERO);
    platform
        .orchestrator
        .execute(summarize_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_validation_failures_cost_nothing() {
    let platform = TestPlatform::new().await.unwrap();

    // Too short for summarize.
    let short = textgate_kernel::OperationRequest::new(
        textgate_kernel::OperationParams::Summarize {
            text: "brief".into(),
            max_sentences: 2,
            language: "en".into(),
        },
    );
    let err = platform.orchestrator.execute(short).await.unwrap_err();
    assert!(matches!(err, PlatformError::Validation(_)));

    // Over the classify input cap.
    let oversized = textgate_kernel::OperationRequest::new(
        textgate_kernel::OperationParams::Classify {
            text: "x".repeat(2001),
            categories: vec!["a".into(), "b".into()],
        },
    );
    let err = platform.orchestrator.execute(oversized).await.unwrap_err();
    assert!(matches!(err, PlatformError::Validation(_)));

    for operation in [Operation::Summarize, Operation::Classify] {
        assert_eq!(request_count(&platform, operation).await, 0);
    }
    assert_eq!(platform.backend.generate_count(), 0);
}

#[tokio::test]
async fn test_output_tokens_capped_by_operation_limit() {
    let platform = TestPlatform::new().await.unwrap();
    // 70 words scripted; the classify cap is 64 tokens.
    let long = vec!["word"; 70].join(" ");
    platform.backend.add_mock_response("CLASSIFICATION:", &long);

    let response = platform
        .orchestrator
        .execute(classify_request(&["a", "b"]))
        .await
        .unwrap();
    assert_eq!(response.meta.output_tokens, 64);
}
