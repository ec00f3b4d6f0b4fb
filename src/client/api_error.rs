//! The PingOne error body.

use serde::{Deserialize, Serialize};

/// An error returned by the PingOne management API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Correlation id of the failed request.
    #[serde(default)]
    pub id: String,
    /// Error code, such as `INVALID_DATA` or `NOT_FOUND`.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Per-field details.
    #[serde(default)]
    pub details: Vec<ApiErrorDetail>,
}

/// One entry of [`ApiError::details`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    /// Detail code, such as `INVALID_VALUE`.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub message: Option<String>,
    /// Request field the detail refers to.
    #[serde(default)]
    pub target: Option<String>,
    /// Constraint data.
    #[serde(default)]
    pub inner_error: Option<InnerError>,
}

/// Constraint data attached to a detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerError {
    /// Smallest accepted value.
    #[serde(default)]
    pub range_minimum_value: Option<i64>,
    /// Largest accepted value.
    #[serde(default)]
    pub range_maximum_value: Option<i64>,
    /// Pattern the value must match.
    #[serde(default)]
    pub allowed_pattern: Option<String>,
    /// Accepted values.
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    /// Upper bound, for single-bound constraints.
    #[serde(default)]
    pub maximum_value: Option<i64>,
    /// Values that still reference the object.
    #[serde(default)]
    pub referenced_values: Option<Vec<String>>,
}

impl ApiError {
    /// Parse a response body, accepting only bodies that carry an error id.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiError>(body)
            .ok()
            .filter(|e| !e.id.is_empty())
    }

    /// The first detail, if any.
    pub fn first_detail(&self) -> Option<&ApiErrorDetail> {
        self.details.first()
    }

    /// Whether the error code is `NOT_FOUND`.
    pub fn is_not_found(&self) -> bool {
        self.code == "NOT_FOUND"
    }

    /// Render the multi-line detail shown beneath an API error diagnostic.
    pub fn render_detail(&self) -> String {
        let mut out = format!(
            "PingOne Error Details:\nID:\t\t{}\nCode:\t\t{}\nMessage:\t{}",
            self.id, self.code, self.message
        );

        if !self.details.is_empty() {
            let rendered: Vec<String> = self.details.iter().map(ApiErrorDetail::render).collect();
            out.push_str("\nDetails:\n");
            out.push_str(&rendered.join("\n"));
        }
        out
    }
}

impl ApiErrorDetail {
    fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(code) = &self.code {
            lines.push(format!("Code:\t{}", code));
        }
        if let Some(message) = &self.message {
            lines.push(format!("Message:\t{}", message));
        }
        if let Some(target) = &self.target {
            lines.push(format!("Target:\t{}", target));
        }
        if let Some(inner) = &self.inner_error {
            lines.push(format!("Data:\n{}", inner.render().trim_end_matches('\n')));
        }

        lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("  {} {}\n", if i == 0 { "-" } else { " " }, line))
            .collect()
    }
}

impl InnerError {
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(v) = self.range_minimum_value {
            out.push_str(&format!("      Range Min Value:\t{}\n", v));
        }
        if let Some(v) = self.range_maximum_value {
            out.push_str(&format!("      Range Max Value:\t{}\n", v));
        }
        if let Some(v) = &self.allowed_pattern {
            out.push_str(&format!("      Allowed Pattern:\t{}\n", v));
        }
        if let Some(v) = &self.allowed_values {
            out.push_str(&format!("      Allowed Values:\t[{}]\n", v.join(", ")));
        }
        if let Some(v) = self.maximum_value {
            out.push_str(&format!("      Max Value:\t{}\n", v));
        }
        if let Some(v) = &self.referenced_values {
            out.push_str(&format!("      Referenced Values:\t[{}]\n", v.join(", ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "id": "5f1b0d9c-0000-4000-8000-000000000001",
        "code": "INVALID_DATA",
        "message": "The request could not be completed. One or more validation errors were in the request.",
        "details": [
            {
                "code": "INVALID_VALUE",
                "target": "name",
                "message": "Name must be unique",
                "innerError": {"allowedValues": ["a", "b"], "rangeMinimumValue": 1}
            }
        ]
    }"#;

    #[test]
    fn test_parse_requires_id() {
        assert!(ApiError::parse(BODY).is_some());
        assert!(ApiError::parse(r#"{"message": "no id"}"#).is_none());
        assert!(ApiError::parse("<html>").is_none());
    }

    #[test]
    fn test_render_detail() {
        let error = ApiError::parse(BODY).unwrap();
        let detail = error.render_detail();

        assert!(detail.starts_with(
            "PingOne Error Details:\nID:\t\t5f1b0d9c-0000-4000-8000-000000000001\nCode:\t\tINVALID_DATA\n"
        ));
        assert!(detail.contains("Details:\n  - Code:\tINVALID_VALUE\n    Message:\tName must be unique\n    Target:\tname\n"));
        assert!(detail.contains("    Data:\n      Range Min Value:\t1\n      Allowed Values:\t[a, b]\n"));
    }

    #[test]
    fn test_render_without_details() {
        let error = ApiError {
            id: "x".to_string(),
            code: "NOT_FOUND".to_string(),
            message: "Unable to find group".to_string(),
            details: Vec::new(),
        };
        assert!(error.is_not_found());
        assert_eq!(
            error.render_detail(),
            "PingOne Error Details:\nID:\t\tx\nCode:\t\tNOT_FOUND\nMessage:\tUnable to find group"
        );
    }
}
