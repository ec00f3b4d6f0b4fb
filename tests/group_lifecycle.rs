//! Full group lifecycle and not-found propagation against a mock API.

mod common;

use common::{env_path, group_body, p1_error, tester, ENV, GROUP};
use pingone_provider::testing::{assert_gone, assert_plan_updates_in_place};
use pingone_provider::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_group_create_read_update_delete() {
    let server = MockServer::start().await;
    let group_path = env_path(&format!("groups/{}", GROUP));

    Mock::given(method("POST"))
        .and(path(env_path("groups")))
        .and(body_partial_json(json!({"name": "admins", "description": "first"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(group_body("admins", Some("first"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(group_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body("admins", Some("first"))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(group_path.clone()))
        .and(body_partial_json(json!({"name": "admins", "description": "second"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body("admins", Some("second"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(group_path.clone()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({"environment_id": ENV, "name": "admins", "description": "first"});

    let created = tester.lifecycle_create("pingone_group", config).await.unwrap();
    assert_eq!(created["id"], GROUP);
    assert_eq!(created["environment_id"], ENV);
    assert_eq!(created["description"], "first");

    let read = tester.read("pingone_group", created.clone()).await.unwrap();
    assert_eq!(read.state.as_ref(), Some(&created));

    let updated_config = json!({"environment_id": ENV, "name": "admins", "description": "second"});
    let plan = tester
        .plan_update("pingone_group", created.clone(), updated_config)
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    let updated = tester
        .update("pingone_group", created, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["description"], "second");
    assert_eq!(updated["id"], GROUP);

    tester.delete("pingone_group", updated.clone()).await.unwrap();

    Mock::given(method("GET"))
        .and(path(group_path))
        .respond_with(ResponseTemplate::new(404).set_body_json(p1_error("NOT_FOUND", "Unable to find group")))
        .mount(&server)
        .await;
    let gone = tester.read("pingone_group", updated).await.unwrap();
    assert_gone(&gone);
    assert_eq!(gone.diagnostics.warnings().count(), 1);
}

#[tokio::test]
async fn test_create_retries_while_parent_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(env_path("groups")))
        .respond_with(ResponseTemplate::new(404).set_body_json(p1_error("NOT_FOUND", "Environment not found")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(env_path("groups")))
        .respond_with(ResponseTemplate::new(201).set_body_json(group_body("admins", None)))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .lifecycle_create("pingone_group", json!({"environment_id": ENV, "name": "admins"}))
        .await
        .unwrap();
    assert_eq!(state["id"], GROUP);

    let attempts = server.received_requests().await.unwrap().len() as u32;
    assert_eq!(attempts, 3);
    assert!(attempts <= RetryPolicy::for_testing().max_attempts);
}

#[tokio::test]
async fn test_update_does_not_retry_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(404).set_body_json(p1_error("NOT_FOUND", "Unable to find group")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let prior = json!({
        "id": GROUP,
        "environment_id": ENV,
        "name": "admins",
        "description": null,
        "population_id": null,
        "user_filter": null,
        "external_id": null
    });
    let mut planned = prior.clone();
    planned["description"] = json!("changed");

    let err = tester.update("pingone_group", prior, planned).await.unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
    assert!(err.diagnostics()[0].summary.contains("UpdateGroup"));
}
