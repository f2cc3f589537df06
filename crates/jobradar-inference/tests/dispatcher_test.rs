//! Dispatch protocol integration tests: rotation, throttling, cooling,
//! and exhaustion, driven through the mock transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jobradar_core::Error;
use jobradar_inference::mock::MockLlmClient;
use jobradar_inference::{Dispatcher, DispatcherConfig, FieldKind, ResponseShape, SlotState};

const GAP: Duration = Duration::from_millis(30);
const COOLDOWN: Duration = Duration::from_millis(80);

fn config(pool_size: usize) -> DispatcherConfig {
    DispatcherConfig::new((0..pool_size).map(|i| format!("key-{i}")).collect())
        .with_min_gap(GAP)
        .with_cooldown(COOLDOWN)
}

fn dispatcher(client: &Arc<MockLlmClient>, config: DispatcherConfig) -> Dispatcher {
    Dispatcher::new(Arc::clone(client) as Arc<dyn jobradar_core::LlmClient>, config).unwrap()
}

#[tokio::test]
async fn rate_limit_rotates_to_next_slot() {
    // Scenario: slot 0 rate-limits once, slot 1 succeeds. One call should
    // observe a single rotation, one cooling mark, and no exhaustion.
    let client = Arc::new(
        MockLlmClient::new()
            .with_rate_limit()
            .with_generation("from slot 1"),
    );
    let dispatcher = dispatcher(&client, config(2));

    let text = dispatcher.generate_text("prompt", None).await.unwrap();
    assert_eq!(text, "from slot 1");

    let creds = client.credentials_used();
    assert_eq!(creds, vec!["key-0", "key-1"]);

    let snapshot = dispatcher.snapshot().await;
    assert_eq!(snapshot[0].state, SlotState::Cooling);
    assert_eq!(snapshot[1].state, SlotState::Healthy);

    // The throttle floor holds between the failed and successful attempt.
    let calls = client.calls();
    assert!(calls[1].at.duration_since(calls[0].at) >= GAP);
}

#[tokio::test]
async fn full_exhaustion_after_retry_budget() {
    // Both credentials rate-limit indefinitely; budget of 2 means two
    // attempts and then a well-typed exhaustion.
    let client = Arc::new(
        MockLlmClient::new()
            .with_rate_limited_credential("key-0")
            .with_rate_limited_credential("key-1"),
    );
    let dispatcher = dispatcher(&client, config(2).with_max_retries(2));

    let err = dispatcher.generate_text("anything", None).await.unwrap_err();
    assert!(matches!(err, Error::Exhausted));
    assert_eq!(client.generate_call_count(), 2);

    let snapshot = dispatcher.snapshot().await;
    assert!(snapshot.iter().all(|s| s.state == SlotState::Cooling));
}

#[tokio::test]
async fn single_slot_pool_is_throttle_plus_cooldown() {
    // Pool of 1: each rate-limited attempt cools the only slot, so the
    // dispatcher waits out the cooldown before retrying, and exhausts
    // after the configured budget.
    let client = Arc::new(MockLlmClient::new().with_rate_limited_credential("key-0"));
    let dispatcher = dispatcher(&client, config(1).with_max_retries(3));

    let start = Instant::now();
    let err = dispatcher.generate_text("prompt", None).await.unwrap_err();

    assert!(matches!(err, Error::Exhausted));
    assert_eq!(client.generate_call_count(), 3);
    // Attempts 2 and 3 each had to wait for the cooldown to elapse.
    assert!(start.elapsed() >= COOLDOWN * 2);
}

#[tokio::test]
async fn throttle_floor_holds_across_successful_calls() {
    let client = Arc::new(MockLlmClient::new().with_default_generation("ok"));
    let dispatcher = dispatcher(&client, config(1));

    for _ in 0..3 {
        dispatcher.generate_text("p", None).await.unwrap();
    }

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(
            pair[1].at.duration_since(pair[0].at) >= GAP,
            "submissions closer than the throttle floor"
        );
    }
}

#[tokio::test]
async fn pool_wide_cooldown_waits_instead_of_busy_looping() {
    // Both slots cool, then the earliest cooldown elapses and the retry
    // succeeds: no exhaustion, and at least one cooldown of wall time.
    let client = Arc::new(
        MockLlmClient::new()
            .with_rate_limit()
            .with_rate_limit()
            .with_generation("after the wait"),
    );
    let dispatcher = dispatcher(&client, config(2).with_max_retries(5));

    let start = Instant::now();
    let text = dispatcher.generate_text("prompt", None).await.unwrap();

    assert_eq!(text, "after the wait");
    assert_eq!(client.generate_call_count(), 3);
    assert!(start.elapsed() >= COOLDOWN);

    // The slot that served the retry is healthy again.
    let snapshot = dispatcher.snapshot().await;
    assert!(snapshot.iter().any(|s| s.state == SlotState::Healthy));
}

#[tokio::test]
async fn deadline_inside_pool_wide_cooldown_exhausts() {
    let client = Arc::new(MockLlmClient::new().with_rate_limit());
    let config = config(1)
        .with_cooldown(Duration::from_secs(30))
        .with_max_retries(3);
    let dispatcher = dispatcher(&client, config);

    let deadline = Instant::now() + Duration::from_millis(50);
    let start = Instant::now();
    let err = dispatcher
        .generate_text("prompt", Some(deadline))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Exhausted));
    // One real attempt, then the cooldown wait was abandoned rather than
    // blocking for the full 30 seconds.
    assert_eq!(client.generate_call_count(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn structured_generation_validates_shape() {
    let shape = ResponseShape::new()
        .field("skills", FieldKind::TextList)
        .optional("seniority", FieldKind::Text)
        .field("summary", FieldKind::Text);

    let client = Arc::new(MockLlmClient::new().with_generation(
        "```json\n{\"skills\": [\"Python\", \"AWS\"], \"seniority\": \"Senior\", \"summary\": \"A role.\"}\n```",
    ));
    let dispatcher = dispatcher(&client, config(1));

    let map = dispatcher
        .generate_structured("prompt", &shape, None)
        .await
        .unwrap();
    assert_eq!(map["skills"].as_array().unwrap().len(), 2);
    assert_eq!(map["summary"], "A role.");
}

#[tokio::test]
async fn structured_generation_surfaces_parse_error() {
    let shape = ResponseShape::new().field("summary", FieldKind::Text);
    let client = Arc::new(MockLlmClient::new().with_generation("{\"unrelated\": true}"));
    let dispatcher = dispatcher(&client, config(2));

    let err = dispatcher
        .generate_structured("prompt", &shape, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    // Parse failures do not consume retry budget or rotate slots.
    assert_eq!(client.generate_call_count(), 1);
}

#[tokio::test]
async fn embed_rotates_on_rate_limit_like_generate() {
    let client = Arc::new(
        MockLlmClient::new()
            .with_embed_rate_limit()
            .with_embedding(vec![0.5; 768]),
    );
    let dispatcher = dispatcher(&client, config(2));

    let vector = dispatcher.embed("resume text", None).await.unwrap();
    assert_eq!(vector.len(), 768);
    assert_eq!(client.embed_call_count(), 2);
    assert_eq!(client.credentials_used(), vec!["key-0", "key-1"]);
}

#[tokio::test]
async fn concurrent_calls_are_serialized_with_gap() {
    // Two tasks dispatch at once; the mutex serializes them and the
    // throttle floor still separates their submissions.
    let client = Arc::new(MockLlmClient::new().with_default_generation("ok"));
    let dispatcher = Arc::new(dispatcher(&client, config(2)));

    let a = {
        let d = Arc::clone(&dispatcher);
        tokio::spawn(async move { d.generate_text("a", None).await })
    };
    let b = {
        let d = Arc::clone(&dispatcher);
        tokio::spawn(async move { d.generate_text("b", None).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].at.duration_since(calls[0].at) >= GAP);
}
