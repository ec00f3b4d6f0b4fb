//! User create and update call sequences, including the enabled flag.

mod common;

use common::{env_path, p1_error, tester, ENV, POPULATION, USER};
use pingone_provider::ProviderService;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_body(email: &str, enabled: bool) -> Value {
    json!({
        "id": USER,
        "environment": {"id": ENV},
        "username": "jdoe",
        "email": email,
        "population": {"id": POPULATION},
        "enabled": enabled
    })
}

fn user_state(email: &str, status: &str) -> Value {
    json!({
        "id": USER,
        "environment_id": ENV,
        "username": "jdoe",
        "email": email,
        "population_id": POPULATION,
        "status": status
    })
}

async fn calls(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

#[tokio::test]
async fn test_create_writes_enabled_then_reads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(env_path("users")))
        .and(body_partial_json(json!({"username": "jdoe", "population": {"id": POPULATION}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(user_body("jdoe@example.com", true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(env_path(&format!("users/{}/enabled", USER))))
        .and(body_partial_json(json!({"enabled": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"enabled": false})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(env_path(&format!("users/{}", USER))))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("jdoe@example.com", false)))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let state = tester
        .lifecycle_create(
            "pingone_user",
            json!({
                "environment_id": ENV,
                "username": "jdoe",
                "email": "jdoe@example.com",
                "population_id": POPULATION,
                "status": "DISABLED"
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], USER);
    assert_eq!(state["status"], "DISABLED");

    let user = env_path(&format!("users/{}", USER));
    assert_eq!(
        calls(&server).await,
        vec![
            format!("POST {}", env_path("users")),
            format!("PUT {}/enabled", user),
            format!("GET {}", user),
        ]
    );
}

#[tokio::test]
async fn test_update_writes_enabled_even_when_unchanged() {
    let server = MockServer::start().await;
    let user = env_path(&format!("users/{}", USER));
    Mock::given(method("PUT"))
        .and(path(user.clone()))
        .and(body_partial_json(json!({"email": "john@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("john@example.com", false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/enabled", user)))
        .and(body_partial_json(json!({"enabled": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"enabled": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(user.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("john@example.com", true)))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let updated = tester
        .update(
            "pingone_user",
            user_state("jdoe@example.com", "ENABLED"),
            user_state("john@example.com", "ENABLED"),
        )
        .await
        .unwrap();
    assert_eq!(updated["email"], "john@example.com");
    assert_eq!(updated["status"], "ENABLED");

    assert_eq!(
        calls(&server).await,
        vec![format!("PUT {}", user), format!("PUT {}/enabled", user), format!("GET {}", user)]
    );
}

#[tokio::test]
async fn test_update_read_back_is_not_retried() {
    let server = MockServer::start().await;
    let user = env_path(&format!("users/{}", USER));
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(user))
        .respond_with(ResponseTemplate::new(404).set_body_json(p1_error("NOT_FOUND", "Unable to find user")))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let result = tester
        .provider()
        .update(
            "pingone_user",
            user_state("jdoe@example.com", "ENABLED"),
            user_state("john@example.com", "ENABLED"),
        )
        .await
        .unwrap();
    assert!(result.state.is_none());
    assert!(!result.diagnostics.has_error());
    assert_eq!(result.diagnostics.warnings().count(), 1);
}
