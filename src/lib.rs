//! PingOne Provider
//!
//! This crate is the lifecycle engine of an infrastructure-as-code provider
//! for the PingOne identity platform. An engine drives it through
//! [`ProviderService`]; the provider answers with planned states, refreshed
//! states and diagnostics.
//!
//! # Overview
//!
//! - **HTTP executor** ([`client`]): authenticated calls to the management
//!   API with retry, permission-propagation handling, and error classification
//! - **Type bridge** ([`value`], [`bridge`]): the null/unknown/known state tree
//!   and conversions to and from API payloads
//! - **Schema, validation and plan** ([`schema`], [`validation`], [`plan`]):
//!   declarative attribute schemas, configuration checks, and plan modifiers
//! - **Resources and data sources** ([`resources`], [`data_sources`]): one
//!   handler per PingOne object type
//! - **Import parsing** ([`import`]): composite `a/b/c` identifiers
//! - **Provider** ([`provider`]): configuration, client construction and
//!   dispatch by type name
//!
//! # Quick Start
//!
//! ```ignore
//! use pingone_provider::{PingOneProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     pingone_provider::init_logging();
//!
//!     let provider = PingOneProvider::new();
//!     provider
//!         .configure(json!({"access_token": std::env::var("TOKEN")?, "region": "EU"}))
//!         .await?;
//!
//!     let config = json!({
//!         "environment_id": "9c052a8a-14be-44e4-8f07-2662569994ce",
//!         "name": "admins"
//!     });
//!     let plan = provider.plan("pingone_group", None, config).await?;
//!     let created = provider.create("pingone_group", plan.planned_state).await?;
//!     println!("{:?}", created.state);
//!     Ok(())
//! }
//! ```
//!
//! # Diagnostics
//!
//! Handlers never return `Err` for API or validation failures. Each result
//! carries [`Diagnostics`]; an error diagnostic means the operation did not
//! take effect (apart from any partial state it reports).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod client;
pub mod data_sources;
pub mod diagnostics;
pub mod error;
pub mod import;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;
pub mod verify;

// Re-export main types at crate root
pub use client::{PingOneClient, ProviderConfig, Region, RequestContext, RetryPolicy};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{PingOneProvider, ProviderService};
pub use schema::ProviderSchema;
pub use types::{
    ApplyResult, AttributeChange, ImportResult, ImportedResource, PlanResult, ProviderMetadata,
};
pub use validation::{is_valid, validate, validate_result};
pub use value::TriState;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
