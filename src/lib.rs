//! Hemmer Random Provider
//!
//! A provider for values that are random at creation time and then stay
//! stable: strings, passwords, integers, pet names, shuffled lists, UUIDs,
//! bytes and ids. Values live only in state; they change when the resource
//! is replaced, for example because one of its `keepers` changed.
//!
//! # Resources
//!
//! | Type | Result |
//! |------|--------|
//! | `random_string` | string from configurable character classes |
//! | `random_password` | like `random_string`, sensitive, with a bcrypt hash |
//! | `random_integer` | integer in `[min, max]`, optionally seeded |
//! | `random_pet` | memorable name such as `gently-brave-otter` |
//! | `random_shuffle` | permutation of a list, optionally seeded |
//! | `random_uuid`, `random_uuid4`, `random_uuid7` | UUID string |
//! | `random_bytes` | bytes as base64 and hex |
//! | `random_id` | bytes as url-safe/std base64, hex and decimal |
//!
//! # Handshake Protocol
//!
//! When started via [`serve`], the provider prints one line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. The host spawns
//! the provider as a subprocess and connects to that address over gRPC.
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: provider capabilities and resource names
//! - **GetSchema**: schema for the provider config and every resource
//! - **ValidateProviderConfig** / **Configure**: the provider takes no configuration
//! - **Stop**: graceful shutdown
//! - **ValidateResourceConfig**: schema and cross-attribute checks
//! - **UpgradeResourceState**: migrates state from older schema versions
//! - **Plan**: defaults, unknown values and the replacement decision
//! - **Create/Read/Update/Delete**: generation happens in Create only
//! - **ImportResourceState**: builds state from an import ID
//!
//! # Example
//!
//! ```
//! use hemmer_provider_random::{ProviderService, RandomProvider};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let provider = RandomProvider::new();
//! let config = json!({"length": 16, "special": false});
//! let plan = provider
//!     .plan("random_string", None, config.clone(), config)
//!     .await
//!     .unwrap();
//! let state = provider.create("random_string", plan.planned_state).await.unwrap();
//! assert_eq!(state["result"].as_str().unwrap().len(), 16);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod random;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::RandomProvider;
pub use resources::{ResourceHandler, ResourceKind};
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
