//! Role assignment scope checks and import identifier parsing.

mod common;

use common::{env_path, tester, APP, ENV, ORG, ROLE};
use pingone_provider::testing::assert_error_contains;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_identity_data_admin(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/roles/{}", ROLE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ROLE,
            "name": "Identity Data Admin",
            "applicableTo": ["ENVIRONMENT", "POPULATION"]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_incompatible_scope_creates_nothing() {
    let server = MockServer::start().await;
    mount_identity_data_admin(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({
        "environment_id": ENV,
        "application_id": APP,
        "role_id": ROLE,
        "scope_organization_id": ORG
    });
    let err = tester
        .lifecycle_create("pingone_application_role_assignment", config)
        .await
        .unwrap_err();
    assert_error_contains(err.diagnostics(), "Incompatible role and scope combination");
    let detail = err.diagnostics()[0].detail.clone().unwrap_or_default();
    assert!(detail.contains("Identity Data Admin"));
}

#[tokio::test]
async fn test_compatible_scope_is_assigned() {
    let server = MockServer::start().await;
    mount_identity_data_admin(&server).await;
    Mock::given(method("POST"))
        .and(path(env_path(&format!("applications/{}/roleAssignments", APP))))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "a8f5c0e2-3b4d-4c6e-9f1a-2b3c4d5e6f70",
            "role": {"id": ROLE},
            "scope": {"id": ENV, "type": "ENVIRONMENT"},
            "readOnly": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .lifecycle_create(
            "pingone_application_role_assignment",
            json!({
                "environment_id": ENV,
                "application_id": APP,
                "role_id": ROLE,
                "scope_environment_id": ENV
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["scope_environment_id"], ENV);
    assert!(state["scope_organization_id"].is_null());
    assert_eq!(state["read_only"], false);
}

#[tokio::test]
async fn test_malformed_import_identifier() {
    let server = MockServer::start().await;
    let tester = tester(&server).await;

    let result = tester
        .import_resource("pingone_application_role_assignment", "badformat/badformat/badformat")
        .await
        .unwrap();
    assert!(result.resources.is_empty());
    assert_error_contains(&result.diagnostics, "Unexpected Import Identifier");
    let detail = result.diagnostics.errors().next().unwrap().detail.clone().unwrap();
    assert!(detail.contains("Invalid import ID specified"));
    assert!(detail.contains("environment_id/application_id/role_assignment_id"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_reads_the_object() {
    let server = MockServer::start().await;
    let assignment = "a8f5c0e2-3b4d-4c6e-9f1a-2b3c4d5e6f70";
    Mock::given(method("GET"))
        .and(path(env_path(&format!("applications/{}/roleAssignments/{}", APP, assignment))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": assignment,
            "role": {"id": ROLE},
            "scope": {"id": ORG, "type": "ORGANIZATION"},
            "readOnly": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let result = tester
        .import_resource(
            "pingone_application_role_assignment",
            &format!("{}/{}/{}", ENV, APP, assignment),
        )
        .await
        .unwrap();
    assert!(!result.diagnostics.has_error());
    assert_eq!(result.resources.len(), 1);
    let state = &result.resources[0].state;
    assert_eq!(state["id"], assignment);
    assert_eq!(state["scope_organization_id"], ORG);
}
