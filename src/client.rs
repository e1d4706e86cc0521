//! High-level client for ESC environments.
//!
//! Wraps [`EscApi`] and resolves opened environments into plain values.

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::api::EscApi;
use crate::error::{EscError, Result};
use crate::models::{
    CheckEnvironment, Environment, EnvironmentDefinition, EnvironmentDiagnostics, OpenEnvironment, OrgEnvironment,
    OrgEnvironments, Value,
};
use crate::resolve::{resolve_named_properties, resolve_property};

/// A definition plus the exact YAML the service returned for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDefinitionResponse {
    pub definition: EnvironmentDefinition,
    pub yaml: String,
}

/// An opened environment and its properties resolved to plain values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentResponse {
    pub environment: Environment,
    /// `None` when the service sent no properties.
    pub values: Option<Map<String, JsonValue>>,
    /// Raw JSON body of the read call.
    pub raw: String,
}

/// A single property of an open session, typed and resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentPropertyResponse {
    pub property: Value,
    pub value: JsonValue,
}

/// Client for reading and managing ESC environments.
///
/// Holds no state besides the API handle, so a single client can serve
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct EscClient {
    api: EscApi,
}

impl EscClient {
    pub fn new(api: EscApi) -> Self {
        Self { api }
    }

    /// The underlying API handle, for calls this client does not wrap.
    pub fn api(&self) -> &EscApi {
        &self.api
    }

    /// List one page of environments. Pass the previous page's
    /// `next_token` to continue.
    pub async fn list_environments(&self, org: &str, continuation_token: Option<&str>) -> Result<OrgEnvironments> {
        Ok(self.api.list_environments(org, continuation_token).await?.data)
    }

    /// List every environment in an organization, following continuation
    /// tokens until the service stops returning one.
    pub async fn list_all_environments(&self, org: &str) -> Result<Vec<OrgEnvironment>> {
        let mut environments = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_environments(org, token.as_deref()).await?;
            let next = page.next_token().map(str::to_string);
            environments.extend(page.environments);
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        Ok(environments)
    }

    pub async fn get_environment(&self, org: &str, env: &str) -> Result<EnvironmentDefinitionResponse> {
        let resp = self.api.get_environment(org, env).await?;
        Ok(EnvironmentDefinitionResponse {
            definition: resp.data,
            yaml: resp.raw,
        })
    }

    pub async fn create_environment(&self, org: &str, env: &str) -> Result<()> {
        self.api.create_environment(org, env).await?;
        Ok(())
    }

    pub async fn update_environment_yaml(&self, org: &str, env: &str, yaml: &str) -> Result<EnvironmentDiagnostics> {
        Ok(self.api.update_environment_yaml(org, env, yaml).await?.data)
    }

    /// Serialize `definition` to YAML and store it.
    pub async fn update_environment(
        &self,
        org: &str,
        env: &str,
        definition: &EnvironmentDefinition,
    ) -> Result<EnvironmentDiagnostics> {
        let yaml = definition.to_yaml()?;
        self.update_environment_yaml(org, env, &yaml).await
    }

    pub async fn delete_environment(&self, org: &str, env: &str) -> Result<()> {
        self.api.delete_environment(org, env).await?;
        Ok(())
    }

    /// Check a YAML definition.
    ///
    /// An invalid definition is not an error here: the service answers 400
    /// with the diagnostics, and those are returned as a normal result.
    pub async fn check_environment_yaml(&self, org: &str, yaml: &str) -> Result<CheckEnvironment> {
        match self.api.check_environment_yaml(org, yaml).await {
            Ok(resp) => Ok(resp.data),
            Err(err) => match validation_failure(&err) {
                Some(check) => {
                    debug!(org, diagnostics = check.diagnostics().len(), "definition failed validation");
                    Ok(check)
                }
                None => Err(err),
            },
        }
    }

    pub async fn check_environment(&self, org: &str, definition: &EnvironmentDefinition) -> Result<CheckEnvironment> {
        let yaml = definition.to_yaml()?;
        self.check_environment_yaml(org, &yaml).await
    }

    /// Fetch a definition with its secrets in plaintext.
    pub async fn decrypt_environment(&self, org: &str, env: &str) -> Result<EnvironmentDefinitionResponse> {
        let resp = self.api.decrypt_environment(org, env).await?;
        Ok(EnvironmentDefinitionResponse {
            definition: resp.data,
            yaml: resp.raw,
        })
    }

    pub async fn open_environment(&self, org: &str, env: &str) -> Result<OpenEnvironment> {
        Ok(self.api.open_environment(org, env).await?.data)
    }

    /// Read an open session and resolve its properties.
    pub async fn read_open_environment(&self, org: &str, env: &str, open_session_id: &str) -> Result<EnvironmentResponse> {
        let resp = self.api.read_open_environment(org, env, open_session_id).await?;
        let values = resolve_named_properties(resp.data.properties.as_ref());
        Ok(EnvironmentResponse {
            environment: resp.data,
            values,
            raw: resp.raw,
        })
    }

    /// Open an environment and read the new session.
    ///
    /// Not atomic: if the read fails, the session stays open on the service
    /// until it expires.
    pub async fn open_and_read_environment(&self, org: &str, env: &str) -> Result<EnvironmentResponse> {
        let open = self.open_environment(org, env).await?;
        self.read_open_environment(org, env, &open.id).await
    }

    /// Read one property of an open session and resolve it.
    pub async fn read_open_environment_property(
        &self,
        org: &str,
        env: &str,
        open_session_id: &str,
        property: &str,
    ) -> Result<EnvironmentPropertyResponse> {
        let resp = self
            .api
            .read_open_environment_property(org, env, open_session_id, property)
            .await?;
        let value = resolve_property(&resp.data.value);
        Ok(EnvironmentPropertyResponse {
            property: resp.data,
            value,
        })
    }
}

/// The check payload carried by a 400 response, if there is one.
///
/// A 400 without diagnostics is a failed request, not an invalid
/// definition, and stays an error.
fn validation_failure(err: &EscError) -> Option<CheckEnvironment> {
    match err {
        EscError::Service { status: 400, body, .. } => serde_json::from_str::<CheckEnvironment>(body)
            .ok()
            .filter(|check| !check.is_valid()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    fn service_error(status: u16, body: &str) -> EscError {
        EscError::Service {
            status,
            message: "failed".to_string(),
            diagnostics: vec![],
            body: body.to_string(),
        }
    }

    #[test]
    fn test_new_keeps_api_handle() {
        let api = EscApi::new(&Configuration::new().with_backend_url("https://api.example.com")).unwrap();
        let client = EscClient::new(api);
        assert_eq!(client.api().base_url(), "https://api.example.com/api/preview");
    }

    #[test]
    fn test_validation_failure_unwraps_400_payload() {
        let err = service_error(400, r#"{"diagnostics": [{"summary": "unknown property \"bad_ref\""}]}"#);
        let check = validation_failure(&err).unwrap();
        assert_eq!(check.diagnostics().len(), 1);
        assert_eq!(check.diagnostics()[0].summary, "unknown property \"bad_ref\"");
    }

    #[test]
    fn test_validation_failure_ignores_other_statuses() {
        assert!(validation_failure(&service_error(500, r#"{"diagnostics": []}"#)).is_none());
        assert!(validation_failure(&service_error(401, "{}")).is_none());
    }

    #[test]
    fn test_validation_failure_needs_json_body() {
        assert!(validation_failure(&service_error(400, "Bad Request")).is_none());
    }

    #[test]
    fn test_validation_failure_needs_diagnostics() {
        let err = service_error(400, r#"{"code": 400, "message": "Bad Request: malformed YAML"}"#);
        assert!(validation_failure(&err).is_none());
        assert!(validation_failure(&service_error(400, r#"{"diagnostics": []}"#)).is_none());
    }

    #[test]
    fn test_client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<EscClient>();
    }
}
