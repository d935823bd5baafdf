//! Read path: cache, single-flight, executor classification, offline handling

mod common;

use common::{harness, json_reply, policy, status_reply, FakeTransport};
use folio::application::api::cache_key;
use folio::domain::error::RequestError;
use folio::domain::model::{DataSource, FetchOptions, Priority};
use futures_util::future::join_all;
use serde_json::json;
use std::time::Duration;

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_cache_key_ignores_param_order() {
    let a = cache_key("getProjects", &params(&[("limit", "5"), ("tag", "rust")]));
    let b = cache_key("getProjects", &params(&[("tag", "rust"), ("limit", "5")]));
    assert_eq!(a, b);
    assert_eq!(a, "getProjects?limit=5&tag=rust");
    assert_eq!(cache_key("getProfile", &[]), "getProfile");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_fetches_share_one_call() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({ "data": [1, 2, 3] })))
        .with_delay(Duration::from_millis(50));
    let h = harness(transport, policy(3), Duration::from_secs(5));

    let calls = (0..5).map(|_| h.api.fetch_data("getProjects", &[], FetchOptions::default()));
    let results = join_all(calls).await;

    assert_eq!(h.transport.calls_for("getProjects"), 1);
    for result in &results {
        let fetched = result.as_ref().expect("fetch succeeds");
        assert_eq!(fetched.value, json!({ "data": [1, 2, 3] }));
        assert_eq!(fetched.source, DataSource::Network);
    }

    // now served from cache
    let again = h
        .api
        .fetch_data("getProjects", &[], FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(again.source, DataSource::Cache);
    assert_eq!(h.transport.calls_for("getProjects"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_fetches_share_one_rejection() {
    let transport =
        FakeTransport::new(|_, _| status_reply(404)).with_delay(Duration::from_millis(20));
    let h = harness(transport, policy(3), Duration::from_secs(5));

    let calls = (0..4).map(|_| h.api.fetch_data("getMissing", &[], FetchOptions::default()));
    let results = join_all(calls).await;

    assert_eq!(h.transport.calls_for("getMissing"), 1);
    for result in results {
        assert_eq!(result, Err(RequestError::HttpStatus(404)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_is_decorated() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({ "data": [] })));
    let h = harness(transport, policy(1), Duration::from_secs(5));

    h.api
        .fetch_data("getSkills", &params(&[("lang", "en")]), FetchOptions::default())
        .await
        .unwrap();

    let request = &h.transport.requests()[0];
    assert_eq!(request.url, common::ENDPOINT);
    assert_eq!(request.query_param("action"), Some("getSkills"));
    assert_eq!(request.query_param("lang"), Some("en"));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-client-version"), Some("folio-test/1.0"));
    let request_id = request.header("x-request-id").expect("request id header");
    assert!(uuid::Uuid::parse_str(request_id).is_ok());

    let log = h.log.recent();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "getSkills");
    assert_eq!(log[0].request_id, request_id);
    assert_eq!(log[0].outcome, "ok");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_not_retried() {
    let transport = FakeTransport::new(|_, _| Ok(folio::domain::model::HttpReply::ok("<html>")));
    let h = harness(transport, policy(3), Duration::from_secs(5));

    let result = h
        .api
        .fetch_data("getProfile", &[], FetchOptions::default())
        .await;

    assert!(matches!(result, Err(RequestError::MalformedResponse(_))));
    assert_eq!(h.transport.calls_for("getProfile"), 1);
    assert!(h.cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_endpoint_times_out() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({})))
        .with_delay(Duration::from_secs(30));
    let h = harness(transport, policy(1), Duration::from_secs(2));

    let result = h
        .api
        .fetch_data("getProfile", &[], FetchOptions::default())
        .await;

    assert_eq!(result, Err(RequestError::Timeout(Duration::from_secs(2))));
}

#[tokio::test(start_paused = true)]
async fn test_force_refresh_overwrites_cache() {
    let transport = FakeTransport::new(|_, seen| json_reply(json!({ "version": seen })));
    let h = harness(transport, policy(1), Duration::from_secs(5));

    let first = h
        .api
        .fetch_data("getProfile", &[], FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(first.value, json!({ "version": 0 }));

    let refreshed = h
        .api
        .fetch_data(
            "getProfile",
            &[],
            FetchOptions {
                force_refresh: true,
                ..FetchOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(refreshed.value, json!({ "version": 1 }));
    assert_eq!(refreshed.source, DataSource::Network);

    let cached = h
        .api
        .fetch_data("getProfile", &[], FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(cached.value, json!({ "version": 1 }));
    assert_eq!(cached.source, DataSource::Cache);
}

#[tokio::test(start_paused = true)]
async fn test_offline_serves_cached_value_without_queueing() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({ "fresh": true })));
    let h = harness(transport, policy(3), Duration::from_secs(5));
    h.cache.set(
        "getProfile",
        json!({ "name": "cached" }),
        Duration::from_secs(60),
    );
    h.connectivity.set_online(false);

    let fetched = h
        .api
        .fetch_data("getProfile", &[], FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(fetched.value, json!({ "name": "cached" }));
    assert_eq!(fetched.source, DataSource::OfflineCache);
    assert!(h.queue.is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_offline_miss_waits_for_connectivity() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({ "data": ["a"] })));
    let h = harness(transport, policy(3), Duration::from_secs(5));
    h.connectivity.set_online(false);

    let api = h.api.clone();
    let pending = tokio::spawn(async move {
        api.fetch_data("getProjects", &[], FetchOptions::default())
            .await
    });

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.queue.len(), 1);
    assert!(!pending.is_finished());
    assert_eq!(h.transport.calls_for("getProjects"), 0);

    h.connectivity.set_online(true);
    let fetched = pending.await.unwrap().unwrap();

    assert_eq!(fetched.value, json!({ "data": ["a"] }));
    assert_eq!(h.transport.calls_for("getProjects"), 1);
    assert!(h.queue.is_empty());
    assert!(h.cache.get("getProjects").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_cache_only_lookup_never_queues() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({ "fresh": true })));
    let h = harness(transport, policy(3), Duration::from_secs(5));
    h.cache.set("getSkills", json!(["rust"]), Duration::from_secs(60));
    h.connectivity.set_online(false);

    let hit = h.api.cached("getSkills", &[]).expect("cached");
    assert_eq!(hit.value, json!(["rust"]));
    assert_eq!(hit.source, DataSource::OfflineCache);

    assert!(h.api.cached("getProjects", &[]).is_none());
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.queue.is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_low_priority_goes_through_queue() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({ "ok": 1 })));
    let h = harness(transport, policy(3), Duration::from_secs(5));

    let fetched = h
        .api
        .fetch_data("getBlog", &[], FetchOptions::with_priority(Priority::Low))
        .await
        .unwrap();

    assert_eq!(fetched.value, json!({ "ok": 1 }));
    assert_eq!(h.queue.stats().enqueued, 1);
    assert_eq!(h.queue.stats().resolved, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sections_fail_independently() {
    let transport = FakeTransport::new(|request, _| match request.query_param("action") {
        Some("getSkills") => status_reply(400),
        Some(action) => json_reply(json!({ "section": action })),
        None => status_reply(404),
    });
    let h = harness(transport, policy(2), Duration::from_secs(5));

    let actions: Vec<String> = ["getProfile", "getSkills", "getProjects"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let results = h.api.load_sections(&actions).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "getProfile");
    assert_eq!(
        results[0].1.as_ref().unwrap().value,
        json!({ "section": "getProfile" })
    );
    assert_eq!(results[1].1, Err(RequestError::HttpStatus(400)));
    assert!(results[2].1.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_and_clear() {
    let transport = FakeTransport::new(|_, _| json_reply(json!({})));
    let h = harness(transport, policy(1), Duration::from_secs(5));

    h.api
        .fetch_data("getProfile", &[], FetchOptions::default())
        .await
        .unwrap();
    h.api
        .fetch_data("getProjects", &params(&[("page", "2")]), FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(h.cache.len(), 2);

    assert!(h.api.invalidate("getProjects", &params(&[("page", "2")])));
    assert!(!h.api.invalidate("getProjects", &params(&[("page", "2")])));
    assert_eq!(h.api.clear_cache(), 1);
    assert!(h.cache.is_empty());
}
