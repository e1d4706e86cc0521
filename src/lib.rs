//! Pulumi ESC client SDK for Rust.
//!
//! Provides typed access to the ESC environments API, and resolution of
//! opened environments from the service's envelope-wrapped representation
//! into plain JSON values.

pub mod api;
pub mod client;
pub mod config;
pub mod environ;
pub mod error;
pub mod models;
pub mod property;
pub mod resolve;

pub use api::{ApiResponse, EscApi};
pub use client::{EnvironmentDefinitionResponse, EnvironmentPropertyResponse, EnvironmentResponse, EscClient};
pub use config::Configuration;
pub use error::{EscError, Result};
pub use property::{Envelope, TypedProperty};
pub use resolve::{redact_named_properties, redact_secrets, resolve_json, resolve_named_properties, resolve_property};
