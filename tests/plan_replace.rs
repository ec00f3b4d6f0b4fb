//! Plans that force replacement, driven from states created against a mock API.

mod common;

use common::{env_path, tester, APP, ATTRIBUTE, ENV, SCHEMA};
use pingone_provider::testing::{assert_plan_changes_attribute, assert_plan_replaces, assert_plan_updates_in_place};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPLACEMENT: &str = "8a7b6c5d-4e3f-4a2b-9c1d-0e9f8a7b6c5d";

#[tokio::test]
async fn test_schema_attribute_gaining_enumerated_values_replaces() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(env_path(&format!("schemas/{}/attributes", SCHEMA))))
        .and(body_partial_json(json!({"name": "favouriteColour", "type": "STRING"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": ATTRIBUTE,
            "name": "favouriteColour",
            "enabled": true,
            "type": "STRING",
            "unique": false,
            "multiValued": false,
            "required": false,
            "ldapAttribute": "favouriteColour",
            "schemaType": "CUSTOM"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(env_path(&format!("schemas/{}/attributes", SCHEMA))))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": REPLACEMENT,
            "name": "favouriteColour",
            "enabled": true,
            "type": "STRING",
            "unique": false,
            "multiValued": false,
            "required": false,
            "ldapAttribute": "favouriteColour",
            "schemaType": "CUSTOM",
            "enumeratedValues": [{"value": "red"}, {"value": "blue"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(env_path(&format!("schemas/{}/attributes/{}", SCHEMA, ATTRIBUTE))))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({"environment_id": ENV, "schema_id": SCHEMA, "name": "favouriteColour"});
    let created = tester
        .lifecycle_create("pingone_schema_attribute", config.clone())
        .await
        .unwrap();
    assert!(created["enumerated_values"].is_null());
    assert_eq!(created["schema_type"], "CUSTOM");

    let unchanged = tester
        .plan_update("pingone_schema_attribute", created.clone(), config.clone())
        .await
        .unwrap();
    assert_plan_updates_in_place(&unchanged);

    let mut with_values = config;
    with_values["enumerated_values"] = json!([{"value": "red"}, {"value": "blue"}]);
    let plan = tester
        .plan_update("pingone_schema_attribute", created.clone(), with_values)
        .await
        .unwrap();
    assert_plan_replaces(&plan, &["enumerated_values"]);
    assert_plan_changes_attribute(&plan, "enumerated_values");

    tester.delete("pingone_schema_attribute", created).await.unwrap();
    let replaced = tester
        .create("pingone_schema_attribute", plan.planned_state)
        .await
        .unwrap();
    assert_eq!(replaced["id"], REPLACEMENT);
    assert_ne!(replaced["id"], ATTRIBUTE);
    assert_eq!(replaced["enumerated_values"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_schema_attribute_boolean_cannot_be_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = json!({
        "environment_id": ENV,
        "schema_id": SCHEMA,
        "name": "isContractor",
        "type": "BOOLEAN"
    });
    let err = tester
        .lifecycle_create("pingone_schema_attribute", config)
        .await
        .unwrap_err();
    let detail = err.diagnostics()[0].detail.clone().unwrap_or_default();
    assert!(detail.starts_with("Cannot create attributes of type BOOLEAN or COMPLEX."));
}

#[tokio::test]
async fn test_secret_trigger_values_replace_semantics() {
    let server = MockServer::start().await;
    let secret_path = env_path(&format!("applications/{}/secret", APP));

    Mock::given(method("POST"))
        .and(path(secret_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(secret_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"secret": "first-secret"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(secret_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"secret": "second-secret"})))
        .mount(&server)
        .await;

    let tester = tester(&server).await;
    let config = |triggers: serde_json::Value| {
        json!({
            "environment_id": ENV,
            "application_id": APP,
            "regenerate_trigger_values": triggers
        })
    };

    let created = tester
        .lifecycle_create("pingone_application_secret", config(json!({"rotation": "1"})))
        .await
        .unwrap();
    assert_eq!(created["secret"], "first-secret");
    assert_eq!(created["id"], APP);
    assert_eq!(created["regenerate_trigger_values"], json!({"rotation": "1"}));

    // adding a key is an in-place update
    let added = tester
        .plan_update(
            "pingone_application_secret",
            created.clone(),
            config(json!({"rotation": "1", "owner": "ops"})),
        )
        .await
        .unwrap();
    assert_plan_updates_in_place(&added);

    // removing one is too
    let removed = tester
        .plan_update("pingone_application_secret", created.clone(), config(json!({})))
        .await
        .unwrap();
    assert_plan_updates_in_place(&removed);

    let changed = tester
        .plan_update("pingone_application_secret", created, config(json!({"rotation": "2"})))
        .await
        .unwrap();
    assert_plan_replaces(&changed, &["regenerate_trigger_values"]);

    let replaced = tester
        .create("pingone_application_secret", changed.planned_state)
        .await
        .unwrap();
    assert_eq!(replaced["secret"], "second-secret");
    assert_eq!(replaced["regenerate_trigger_values"], json!({"rotation": "2"}));
}
