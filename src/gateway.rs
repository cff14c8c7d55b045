//! Traits and type definitions for talking to the proxy control plane.
//!
//! The `gateway` module contains the client side of the proxy's
//! administrative API. The interface for all operations is provided by the
//! [`ControlPlane`] trait, which covers listing configured deployments,
//! fetching usage metrics and pending access requests, registering and
//! deleting deployments, and running a health check.
//!
//! ## Control Plane
//!
//! The HTTP implementation lives in [`proxy::ProxyGateway`]. Commands and the
//! registration mapper are written against the trait so they can be exercised
//! against a fake in tests.
//!
//! ## Error Handling
//!
//! The proxy reports errors with HTTP status codes and a JSON payload. The
//! raw per-status variants are kept in [`api::Error`]; this module
//! encapsulates them in [`Error`], and the [`ErrorKind`] enum provides an
//! indication of the category of error that was raised.

pub(crate) mod api;
pub(crate) mod proxy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fmt;

/// This is a list specifying general categories of errors that
/// can be returned by the [`ControlPlane`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum ErrorKind {
    /// Failed to connect to the proxy. This could be due to network
    /// issues like DNS resolution, connectivity issues, or routing
    /// problems.
    Connection,
    /// A request timed out.
    TimedOut,
    /// An access token was not provided or is not valid.
    Authentication,
    /// The caller's role does not permit the operation.
    PermissionDenied,
    /// A rate limit was reached or a quota was exceeded.
    ExcessUsage,
    /// The requested resource was not found. This likely means the
    /// deployment id does not exist on the proxy.
    NotFound,
    /// The request was malformed or is otherwise improper. This
    /// often corresponds to errors with HTTP status codes in
    /// the 400s.
    BadRequest,
    /// The proxy encountered an error. This often corresponds to
    /// errors with HTTP status codes in the 500s.
    InternalError,
    /// An API response was unable to be deserialized, malformed,
    /// or otherwise violated the assumptions of the client.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            source: Some(source),
        }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Connection => "failed to connect to the proxy",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::PermissionDenied => "the caller is not permitted to perform the operation",
            ErrorKind::ExcessUsage => "rate limit exceeded or quota crossed",
            ErrorKind::NotFound => "the requested resource was not found",
            ErrorKind::BadRequest => "the request was bad or malformed",
            ErrorKind::InternalError => "the proxy encountered an internal error",
            ErrorKind::UnexpectedResponse => "API response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())?;

        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

/// Connection parameters of a deployment. The proxy treats these as an
/// opaque object; the `model` and `api_base` keys are well-known and carry
/// the target identifier and endpoint.
pub(crate) type DeploymentParams = BTreeMap<String, serde_json::Value>;

/// Cost and capability metadata attached to a deployment. Every field is
/// optional; the proxy fills in what it knows.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub(crate) struct ModelInfo {
    /// Internal id of the deployment, required for deletion.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub input_cost_per_token: Option<f64>,
    #[serde(default)]
    pub output_cost_per_token: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    /// The underlying model a deployment serves, declared for cost
    /// tracking when the target identifier alone is not meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
}

/// A configured model deployment as reported by the proxy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ModelRecord {
    /// The public name requests are routed under.
    pub model_name: String,
    /// Connection parameters, including the target identifier and endpoint.
    /// The proxy's wire name for this object is `litellm_params`.
    #[serde(rename = "litellm_params", default)]
    pub params: DeploymentParams,
    /// Cost/capability metadata, absent for deployments the proxy has no
    /// record for.
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
}

impl ModelRecord {
    /// The target model identifier, if the deployment declares one.
    pub(crate) fn target_model(&self) -> Option<&str> {
        self.params.get("model").and_then(|v| v.as_str())
    }

    /// The endpoint the deployment connects to, if declared.
    pub(crate) fn api_base(&self) -> Option<&str> {
        self.params.get("api_base").and_then(|v| v.as_str())
    }
}

/// A provider-reported usage aggregate for one model.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct MetricSample {
    pub model: String,
    pub num_requests: u64,
    pub avg_latency_seconds: f64,
}

/// A user's pending request for access to one or more models.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct PendingRequest {
    pub request_id: String,
    pub user_id: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub justification: Option<String>,
}

/// A reference-table entry: the provider owning a canonical model
/// identifier, plus whatever cost/capability metadata the table carries.
/// The table is static and externally supplied; unknown fields are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub(crate) struct ReferenceEntry {
    #[serde(default)]
    pub litellm_provider: Option<String>,
    #[serde(default)]
    pub input_cost_per_token: Option<f64>,
    #[serde(default)]
    pub output_cost_per_token: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
}

pub(crate) type ReferenceTable = HashMap<String, ReferenceEntry>;

/// The request the registration mapper builds for each target identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct RegistrationRequest {
    pub model_name: String,
    #[serde(rename = "litellm_params")]
    pub params: DeploymentParams,
    pub model_info: ModelInfo,
}

/// The interface to the proxy's administrative API.
#[async_trait]
pub(crate) trait ControlPlane {
    /// Lists the deployments configured on the proxy.
    async fn model_info(&self) -> Result<Vec<ModelRecord>, Error>;

    /// Fetches per-model usage metrics.
    async fn model_metrics(&self) -> Result<Vec<MetricSample>, Error>;

    /// Fetches pending model access requests. Privileged.
    async fn pending_requests(&self) -> Result<Vec<PendingRequest>, Error>;

    /// Fetches the static model-cost/provider reference table.
    async fn reference_table(&self) -> Result<ReferenceTable, Error>;

    /// Registers a new deployment.
    async fn create_model(&self, request: &RegistrationRequest) -> Result<(), Error>;

    /// Deletes a deployment by its internal id.
    async fn delete_model(&self, model_id: &str) -> Result<(), Error>;

    /// Runs a small request through every configured deployment and
    /// returns the proxy's diagnostic payload.
    async fn health(&self) -> Result<serde_json::Value, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_record_reads_params_from_the_wire_name() {
        // The proxy reports connection parameters under `litellm_params`.
        let record: ModelRecord = serde_json::from_value(json!({
            "model_name": "gpt-4-public",
            "litellm_params": {
                "model": "azure/gpt-4",
                "api_base": "https://example.azure.com",
                "api_key": "sk-secret"
            }
        }))
        .unwrap();

        assert_eq!(record.target_model(), Some("azure/gpt-4"));
        assert_eq!(record.api_base(), Some("https://example.azure.com"));
        assert!(record.model_info.is_none());

        let record: ModelRecord = serde_json::from_value(json!({
            "model_name": "bare",
            "model_info": { "id": "dep-1", "max_tokens": 8192 }
        }))
        .unwrap();

        assert_eq!(record.target_model(), None);

        let info = record.model_info.unwrap();

        assert_eq!(info.id.as_deref(), Some("dep-1"));
        assert_eq!(info.max_tokens, Some(8192));
        assert_eq!(info.input_cost_per_token, None);
    }

    #[test]
    fn reference_entry_ignores_unknown_fields() {
        let entry: ReferenceEntry = serde_json::from_value(json!({
            "litellm_provider": "anthropic",
            "input_cost_per_token": 1.5e-5,
            "mode": "chat",
            "supports_function_calling": true
        }))
        .unwrap();

        assert_eq!(entry.litellm_provider.as_deref(), Some("anthropic"));
        assert_eq!(entry.input_cost_per_token, Some(1.5e-5));
    }

    #[test]
    fn requests_serialize_params_under_the_wire_name() {
        let mut params = DeploymentParams::new();

        params.insert("model".to_string(), json!("m1"));

        let request = RegistrationRequest {
            model_name: "m".to_string(),
            params,
            model_info: ModelInfo::default(),
        };

        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("params").is_none());
        assert_eq!(value["litellm_params"]["model"], json!("m1"));
        assert!(value["model_info"].get("base_model").is_none());
    }
}
