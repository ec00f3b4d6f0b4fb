//! Data source lookups by id and by name.

mod common;

use common::{env_path, group_body, tester, ENV, GROUP, ROLE};
use pingone_provider::testing::assert_error_contains;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_group_by_name_follows_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(env_path("groups")))
        .and(query_param("cursor", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"groups": [group_body("admins", Some("the admins"))]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(env_path("groups")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"groups": [{"id": "2e5f9ed1-5d49-4e8b-b4f6-9e46f09f5d12", "name": "operators"}]},
            "_links": {"next": {"href": format!("{}{}?cursor=2", server.uri(), env_path("groups"))}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .read_data_source("pingone_group", json!({"environment_id": ENV, "name": "admins"}))
        .await
        .unwrap();
    assert_eq!(state["id"], GROUP);
    assert_eq!(state["group_id"], GROUP);
    assert_eq!(state["description"], "the admins");
}

#[tokio::test]
async fn test_name_with_reserved_characters_is_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(env_path("groups")))
        .and(query_param("filter", "name eq \"R&D #1+\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"groups": [group_body("R&D #1+", None)]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .read_data_source("pingone_group", json!({"environment_id": ENV, "name": "R&D #1+"}))
        .await
        .unwrap();
    assert_eq!(state["group_id"], GROUP);
    assert_eq!(state["name"], "R&D #1+");
}

#[tokio::test]
async fn test_population_name_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(env_path("populations")))
        .and(query_param("filter", "name eq \"Sales & Marketing\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"populations": [{
                "id": "4c3b2a19-0f8e-4d7c-9b6a-5a4938271605",
                "name": "Sales & Marketing"
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .read_data_source("pingone_population", json!({"environment_id": ENV, "name": "Sales & Marketing"}))
        .await
        .unwrap();
    assert_eq!(state["population_id"], "4c3b2a19-0f8e-4d7c-9b6a-5a4938271605");
}

#[tokio::test]
async fn test_group_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(env_path(&format!("groups/{}", GROUP))))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body("admins", None)))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .read_data_source("pingone_group", json!({"environment_id": ENV, "group_id": GROUP}))
        .await
        .unwrap();
    assert_eq!(state["name"], "admins");
    assert!(state["description"].is_null());
}

#[tokio::test]
async fn test_application_name_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(env_path("applications")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_embedded": {"applications": []}})))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let err = tester
        .read_data_source("pingone_application", json!({"environment_id": ENV, "name": "missing-app"}))
        .await
        .unwrap_err();
    assert_error_contains(err.diagnostics(), "Cannot find application from name");
    assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("name"));
}

#[tokio::test]
async fn test_role_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"roles": [
                {"id": "1f0c3a6e-8d2b-4c59-a7e1-3b4c5d6e7f80", "name": "Environment Admin", "applicableTo": ["ORGANIZATION", "ENVIRONMENT"]},
                {"id": ROLE, "name": "Identity Data Admin", "applicableTo": ["POPULATION", "ENVIRONMENT"]}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .read_data_source("pingone_role", json!({"name": "Identity Data Admin"}))
        .await
        .unwrap();
    assert_eq!(state["role_id"], ROLE);
    assert_eq!(state["applicable_to"], json!(["ENVIRONMENT", "POPULATION"]));
}

#[tokio::test]
async fn test_lookup_keys_are_exclusive() {
    let server = MockServer::start().await;
    let tester = tester(&server).await;
    let err = tester
        .read_data_source(
            "pingone_group",
            json!({"environment_id": ENV, "group_id": GROUP, "name": "admins"}),
        )
        .await
        .unwrap_err();
    assert_error_contains(err.diagnostics(), "Invalid Attribute Combination");
    assert!(server.received_requests().await.unwrap().is_empty());
}
