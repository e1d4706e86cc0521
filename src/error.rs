//! Error types for ESC API calls.

use thiserror::Error;

use crate::models::EnvironmentDiagnostic;

/// Errors returned by [`EscApi`](crate::api::EscApi) and
/// [`EscClient`](crate::client::EscClient).
///
/// Resolution of property values never fails, so nothing in
/// [`resolve`](crate::resolve) produces this type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EscError {
    /// The service answered with a non-success status.
    #[error("[esc] {}", service_message(*status, message, diagnostics))]
    Service {
        /// HTTP status code.
        status: u16,
        /// Message from the error document, or the status reason.
        message: String,
        /// Diagnostics carried by the error document, if any.
        diagnostics: Vec<EnvironmentDiagnostic>,
        /// Raw response body.
        body: String,
    },

    /// The request could not be sent or its body could not be read.
    #[error("[esc] request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A JSON response did not match the expected model.
    #[error("[esc] failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An environment definition could not be converted to or from YAML.
    #[error("[esc] invalid environment definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A temporary file for a projected environment could not be written.
    #[error("[esc] i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The client configuration is unusable.
    #[error("[esc] invalid configuration: {0}")]
    Config(String),
}

impl EscError {
    /// HTTP status of a service error.
    pub fn status(&self) -> Option<u16> {
        match self {
            EscError::Service { status, .. } => Some(*status),
            EscError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the service reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn service_message(status: u16, message: &str, diagnostics: &[EnvironmentDiagnostic]) -> String {
    let mut out = format!("[{}] {}", status, message);
    if !diagnostics.is_empty() {
        out.push_str("\nDiags:");
        for d in diagnostics {
            out.push('\n');
            out.push_str(&d.summary);
        }
    }
    out
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EscError>;
