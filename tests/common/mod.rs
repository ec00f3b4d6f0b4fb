//! Shared fixtures for the mock-API integration tests.

#![allow(dead_code)]

use pingone_provider::testing::{mock_config, ProviderTester};
use pingone_provider::PingOneProvider;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";
pub const GROUP: &str = "1d4f8dc0-4c38-4d7a-a3e5-8d35ef8f4c01";
pub const APP: &str = "3b8e6a52-2b6d-4c85-9d7f-7d9d0c6b1a2e";
pub const ROLE: &str = "7c1e2f4a-9b3d-4e6f-8a1c-2d3e4f5a6b7c";
pub const ORG: &str = "0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d";
pub const SCHEMA: &str = "5e4d3c2b-1a09-4f8e-9d7c-6b5a49382716";
pub const ATTRIBUTE: &str = "6f5e4d3c-2b1a-4f0e-9d8c-7b6a5a493827";
pub const POPULATION: &str = "4c3b2a19-0f8e-4d7c-9b6a-5a4938271605";
pub const USER: &str = "8e7d6c5b-4a39-4281-9f0e-1d2c3b4a5968";

/// A configured tester talking to `server`.
pub async fn tester(server: &MockServer) -> ProviderTester<PingOneProvider> {
    let tester = ProviderTester::for_mock_server();
    tester
        .configure(mock_config(&server.uri()))
        .await
        .expect("configure against mock server");
    tester
}

/// A configured tester with `global_options` set.
pub async fn tester_with_options(server: &MockServer, global_options: Value) -> ProviderTester<PingOneProvider> {
    let mut config = mock_config(&server.uri());
    config["global_options"] = global_options;
    let tester = ProviderTester::for_mock_server();
    tester.configure(config).await.expect("configure against mock server");
    tester
}

/// Management API path below the environment.
pub fn env_path(rest: &str) -> String {
    format!("/v1/environments/{}/{}", ENV, rest)
}

/// A PingOne error body.
pub fn p1_error(code: &str, message: &str) -> Value {
    json!({"id": "err-1", "code": code, "message": message})
}

/// A group as the API returns it.
pub fn group_body(name: &str, description: Option<&str>) -> Value {
    let mut body = json!({
        "id": GROUP,
        "environment": {"id": ENV},
        "name": name,
        "directMemberCounts": {"users": 0}
    });
    if let Some(description) = description {
        body["description"] = json!(description);
    }
    body
}
