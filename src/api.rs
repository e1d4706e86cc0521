//! HTTP access to the ESC environments API.
//!
//! One method per endpoint. Responses come back with their raw body text so
//! callers can hand the exact document on (YAML definitions, JSON payloads).

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::error::{EscError, Result};
use crate::models::{
    CheckEnvironment, Environment, EnvironmentDefinition, EnvironmentDiagnostic, EnvironmentDiagnostics,
    OpenEnvironment, OrgEnvironments, Value,
};

const API_PREFIX: &str = "/api/preview";
const YAML_CONTENT_TYPE: &str = "application/x-yaml";

/// Characters escaped in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A decoded response together with its status and body text.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
    pub raw: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    diagnostics: Option<Vec<EnvironmentDiagnostic>>,
}

/// Low-level ESC API client.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct EscApi {
    base_url: String,
    client: Client,
}

impl EscApi {
    /// Build a client from configuration.
    pub fn new(config: &Configuration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(ref token) = config.access_token {
            let value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| EscError::Config(format!("access token is not a valid header value: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: format!("{}{}", config.backend_url.trim_end_matches('/'), API_PREFIX),
            client: builder.build()?,
        })
    }

    /// Root of every endpoint, e.g. `https://api.pulumi.com/api/preview`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List one page of environments in an organization.
    pub async fn list_environments(
        &self,
        org: &str,
        continuation_token: Option<&str>,
    ) -> Result<ApiResponse<OrgEnvironments>> {
        let mut request = self.request(Method::GET, &[org]);
        if let Some(token) = continuation_token {
            request = request.query(&[("continuationToken", token)]);
        }
        let (status, raw) = self.execute(request, "list_environments").await?;
        decode_json(status, raw)
    }

    pub async fn create_environment(&self, org: &str, env: &str) -> Result<ApiResponse<()>> {
        let request = self.request(Method::POST, &[org, env]);
        let (status, raw) = self.execute(request, "create_environment").await?;
        Ok(ApiResponse { status, data: (), raw })
    }

    /// Fetch an environment's definition as YAML.
    pub async fn get_environment(&self, org: &str, env: &str) -> Result<ApiResponse<EnvironmentDefinition>> {
        let request = self
            .request(Method::GET, &[org, env])
            .header(ACCEPT, YAML_CONTENT_TYPE);
        let (status, raw) = self.execute(request, "get_environment").await?;
        decode_yaml(status, raw)
    }

    /// Replace an environment's definition with the given YAML.
    pub async fn update_environment_yaml(
        &self,
        org: &str,
        env: &str,
        yaml: &str,
    ) -> Result<ApiResponse<EnvironmentDiagnostics>> {
        let request = self
            .request(Method::PATCH, &[org, env])
            .header(CONTENT_TYPE, YAML_CONTENT_TYPE)
            .body(yaml.to_string());
        let (status, raw) = self.execute(request, "update_environment").await?;
        decode_json_or_default(status, raw)
    }

    pub async fn delete_environment(&self, org: &str, env: &str) -> Result<ApiResponse<()>> {
        let request = self.request(Method::DELETE, &[org, env]);
        let (status, raw) = self.execute(request, "delete_environment").await?;
        Ok(ApiResponse { status, data: (), raw })
    }

    /// Evaluate a candidate definition without storing it.
    pub async fn check_environment_yaml(&self, org: &str, yaml: &str) -> Result<ApiResponse<CheckEnvironment>> {
        let request = self
            .request(Method::POST, &[org, "yaml", "check"])
            .header(CONTENT_TYPE, YAML_CONTENT_TYPE)
            .body(yaml.to_string());
        let (status, raw) = self.execute(request, "check_environment").await?;
        decode_json_or_default(status, raw)
    }

    /// Fetch an environment's definition with secrets in plaintext.
    pub async fn decrypt_environment(&self, org: &str, env: &str) -> Result<ApiResponse<EnvironmentDefinition>> {
        let request = self
            .request(Method::GET, &[org, env, "decrypt"])
            .header(ACCEPT, YAML_CONTENT_TYPE);
        let (status, raw) = self.execute(request, "decrypt_environment").await?;
        decode_yaml(status, raw)
    }

    /// Start an open session for an environment.
    pub async fn open_environment(&self, org: &str, env: &str) -> Result<ApiResponse<OpenEnvironment>> {
        let request = self.request(Method::POST, &[org, env, "open"]);
        let (status, raw) = self.execute(request, "open_environment").await?;
        decode_json(status, raw)
    }

    /// Read every property of an open session.
    pub async fn read_open_environment(
        &self,
        org: &str,
        env: &str,
        open_session_id: &str,
    ) -> Result<ApiResponse<Environment>> {
        let request = self.request(Method::GET, &[org, env, "open", open_session_id]);
        let (status, raw) = self.execute(request, "read_open_environment").await?;
        decode_json(status, raw)
    }

    /// Read one property (a property path such as `pulumiConfig.foo`) of an
    /// open session.
    pub async fn read_open_environment_property(
        &self,
        org: &str,
        env: &str,
        open_session_id: &str,
        property: &str,
    ) -> Result<ApiResponse<Value>> {
        let request = self
            .request(Method::GET, &[org, env, "open", open_session_id])
            .query(&[("property", property)]);
        let (status, raw) = self.execute(request, "read_open_environment_property").await?;
        decode_json(status, raw)
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = format!("{}/environments", self.base_url);
        for segment in segments {
            url.push('/');
            url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client.request(method, self.url(segments))
    }

    async fn execute(&self, request: RequestBuilder, operation: &'static str) -> Result<(u16, String)> {
        let response = request.send().await?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), url = %response.url(), "esc api response");

        let raw = response.text().await?;
        if !status.is_success() {
            let err = service_error(status, raw);
            warn!(operation, error = %err, "esc api call failed");
            return Err(err);
        }
        Ok((status.as_u16(), raw))
    }
}

fn service_error(status: StatusCode, body: String) -> EscError {
    let parsed: Option<ErrorResponse> = serde_json::from_str(&body).ok();
    let (message, diagnostics) = match parsed {
        Some(resp) => (resp.message, resp.diagnostics.unwrap_or_default()),
        None => (None, Vec::new()),
    };

    EscError::Service {
        status: status.as_u16(),
        message: message
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string()),
        diagnostics,
        body,
    }
}

fn decode_json<T: DeserializeOwned>(status: u16, raw: String) -> Result<ApiResponse<T>> {
    let data = serde_json::from_str(&raw)?;
    Ok(ApiResponse { status, data, raw })
}

fn decode_json_or_default<T: DeserializeOwned + Default>(status: u16, raw: String) -> Result<ApiResponse<T>> {
    if raw.trim().is_empty() {
        return Ok(ApiResponse {
            status,
            data: T::default(),
            raw,
        });
    }
    decode_json(status, raw)
}

fn decode_yaml(status: u16, raw: String) -> Result<ApiResponse<EnvironmentDefinition>> {
    let data = EnvironmentDefinition::from_yaml(&raw)?;
    Ok(ApiResponse { status, data, raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(backend: &str) -> EscApi {
        EscApi::new(&Configuration::new().with_backend_url(backend)).unwrap()
    }

    #[test]
    fn test_base_url_appends_api_prefix() {
        assert_eq!(api("https://api.example.com/").base_url(), "https://api.example.com/api/preview");
        assert_eq!(api("https://api.example.com").base_url(), "https://api.example.com/api/preview");
    }

    #[test]
    fn test_url_encodes_segments() {
        let api = api("https://api.example.com");
        assert_eq!(
            api.url(&["acme", "dev", "open"]),
            "https://api.example.com/api/preview/environments/acme/dev/open"
        );
        assert_eq!(
            api.url(&["acme", "my env/x"]),
            "https://api.example.com/api/preview/environments/acme/my%20env%2Fx"
        );
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let config = Configuration::new().with_access_token("bad\ntoken");
        match EscApi::new(&config) {
            Err(EscError::Config(msg)) => assert!(msg.contains("access token")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_service_error_decodes_error_document() {
        let body = r#"{"code": 400, "message": "Bad Request", "diagnostics": [{"summary": "oops"}]}"#;
        match service_error(StatusCode::BAD_REQUEST, body.to_string()) {
            EscError::Service {
                status,
                message,
                diagnostics,
                body: raw,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Bad Request");
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].summary, "oops");
                assert_eq!(raw, body);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_service_error_plain_body_uses_reason() {
        match service_error(StatusCode::NOT_FOUND, "not here".to_string()) {
            EscError::Service { message, diagnostics, .. } => {
                assert_eq!(message, "Not Found");
                assert!(diagnostics.is_empty());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_blank_body_decodes_to_default() {
        let resp: ApiResponse<EnvironmentDiagnostics> = decode_json_or_default(200, "  ".to_string()).unwrap();
        assert!(resp.data.is_empty());
    }
}
