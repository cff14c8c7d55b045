//! Mapping of a registration form into per-deployment create requests.
//!
//! A single submission registers one deployment per selected target
//! identifier, all under the same public name. The mapper is pure: it
//! validates the form, routes each field to the connection-parameter set
//! or the capability metadata, and produces the full batch of requests
//! before anything is dispatched. Dispatch issues the whole batch
//! concurrently and collects a per-identifier outcome for each request.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::{self, ControlPlane, DeploymentParams, ModelInfo, RegistrationRequest};

/// The providers a deployment can be registered against. The route key is
/// the label the reference table files canonical identifiers under.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub(crate) enum ProviderChoice {
    #[strum(serialize = "openai")]
    #[serde(rename = "openai")]
    OpenAI,
    #[strum(serialize = "azure")]
    #[serde(rename = "azure")]
    Azure,
    #[strum(serialize = "anthropic")]
    #[serde(rename = "anthropic")]
    Anthropic,
    #[strum(serialize = "gemini")]
    #[serde(rename = "gemini")]
    GoogleAIStudio,
    #[strum(serialize = "bedrock")]
    #[serde(rename = "bedrock")]
    Bedrock,
    #[strum(serialize = "openai-compatible")]
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl ProviderChoice {
    /// The provider label canonical identifiers are filed under in the
    /// reference table. OpenAI-compatible endpoints speak the OpenAI
    /// protocol and share its key.
    pub(crate) fn route_key(&self) -> &'static str {
        match self {
            ProviderChoice::OpenAI | ProviderChoice::OpenAICompatible => "openai",
            ProviderChoice::Azure => "azure",
            ProviderChoice::Anthropic => "anthropic",
            ProviderChoice::GoogleAIStudio => "gemini",
            ProviderChoice::Bedrock => "bedrock",
        }
    }
}

/// The submitted registration form, held as an explicit value rather
/// than state threaded through handlers.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct RegistrationForm {
    /// Public name users route requests under; copied verbatim into
    /// every generated request.
    pub model_name: String,
    pub provider: ProviderChoice,
    /// Target identifiers; one deployment is created per entry.
    pub models: Vec<String>,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    pub organization_id: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region_name: Option<String>,
    /// Declared underlying model, routed to capability metadata for cost
    /// tracking rather than to the connection parameters.
    pub base_model: Option<String>,
    /// Free-form extra parameters, as JSON object text.
    pub extra_params: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum FormError {
    #[error("no target model identifiers were given")]
    NoModels,
    #[error("the \"{1}\" field is required for provider \"{0}\"")]
    MissingField(ProviderChoice, &'static str),
    #[error("failed to parse extra params: {0}")]
    ExtraParamsInvalid(#[source] serde_json::Error),
    #[error("extra params must be a JSON object")]
    ExtraParamsNotObject,
}

impl RegistrationForm {
    /// Field requirements mirror the provider-specific portion of the
    /// registration form: every provider except Bedrock authenticates
    /// with an API key; Azure and OpenAI-compatible endpoints need an
    /// explicit API base; Azure needs an API version; Bedrock needs the
    /// AWS credential triple.
    fn validate(&self) -> Result<(), FormError> {
        if self.models.is_empty() {
            return Err(FormError::NoModels);
        }

        let require = |field: &Option<String>, name: &'static str| match field {
            Some(_) => Ok(()),
            None => Err(FormError::MissingField(self.provider, name)),
        };

        match self.provider {
            ProviderChoice::Bedrock => {
                require(&self.aws_access_key_id, "aws_access_key_id")?;
                require(&self.aws_secret_access_key, "aws_secret_access_key")?;
                require(&self.aws_region_name, "aws_region_name")?;
            }
            ProviderChoice::Azure => {
                require(&self.api_key, "api_key")?;
                require(&self.api_base, "api_base")?;
                require(&self.api_version, "api_version")?;
            }
            ProviderChoice::OpenAICompatible => {
                require(&self.api_key, "api_key")?;
                require(&self.api_base, "api_base")?;
            }
            ProviderChoice::OpenAI | ProviderChoice::Anthropic | ProviderChoice::GoogleAIStudio => {
                require(&self.api_key, "api_key")?;
            }
        }

        Ok(())
    }

    fn extra_params(&self) -> Result<DeploymentParams, FormError> {
        let text = match self.extra_params.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Ok(DeploymentParams::new()),
        };

        let value: Value = serde_json::from_str(text).map_err(FormError::ExtraParamsInvalid)?;

        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(FormError::ExtraParamsNotObject),
        }
    }
}

fn insert_field(params: &mut DeploymentParams, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        params.insert(key.to_string(), Value::String(value.clone()));
    }
}

/// Builds one create request per target identifier.
///
/// The provider choice and the aggregate identifier list are consumed for
/// routing only. Explicit fields land in the connection parameters under
/// their original names, then the free-form extra parameters are merged
/// on top (free-form wins on conflict). A malformed extra-parameter block
/// fails the whole submission before anything is dispatched.
pub(crate) fn build_requests(
    form: &RegistrationForm,
) -> Result<Vec<RegistrationRequest>, FormError> {
    form.validate()?;

    let mut base_params = DeploymentParams::new();

    insert_field(&mut base_params, "api_key", &form.api_key);
    insert_field(&mut base_params, "api_base", &form.api_base);
    insert_field(&mut base_params, "api_version", &form.api_version);
    insert_field(&mut base_params, "organization_id", &form.organization_id);
    insert_field(&mut base_params, "aws_access_key_id", &form.aws_access_key_id);
    insert_field(
        &mut base_params,
        "aws_secret_access_key",
        &form.aws_secret_access_key,
    );
    insert_field(&mut base_params, "aws_region_name", &form.aws_region_name);

    for (key, value) in form.extra_params()? {
        base_params.insert(key, value);
    }

    let model_info = ModelInfo {
        base_model: form.base_model.clone(),
        ..Default::default()
    };

    let requests = form
        .models
        .iter()
        .map(|target| {
            let mut params = base_params.clone();

            params.insert("model".to_string(), Value::String(target.clone()));

            RegistrationRequest {
                model_name: form.model_name.clone(),
                params,
                model_info: model_info.clone(),
            }
        })
        .collect();

    Ok(requests)
}

/// The outcome of one create request within a batch.
pub(crate) struct DispatchOutcome {
    pub target: String,
    pub result: Result<(), gateway::Error>,
}

/// Consolidated result of a registration batch. Already-created
/// deployments are never rolled back on partial failure; the summary
/// reports which targets succeeded and which did not.
pub(crate) struct BatchSummary {
    pub outcomes: Vec<DispatchOutcome>,
}

impl BatchSummary {
    pub(crate) fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }

    pub(crate) fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }
}

/// Dispatches the batch concurrently, one create call per request, and
/// collects every per-target outcome.
pub(crate) async fn dispatch<G: ControlPlane + Sync>(
    gateway: &G,
    requests: &[RegistrationRequest],
) -> BatchSummary {
    let calls = requests.iter().map(|request| async move {
        let target = request
            .params
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(request.model_name.as_str())
            .to_string();

        DispatchOutcome {
            target,
            result: gateway.create_model(request).await,
        }
    });

    BatchSummary {
        outcomes: join_all(calls).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        Error, ErrorKind, MetricSample, ModelRecord, PendingRequest, ReferenceTable,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    fn form(provider: ProviderChoice, models: &[&str]) -> RegistrationForm {
        RegistrationForm {
            model_name: "gpt-4-public".to_string(),
            provider,
            models: models.iter().map(|m| m.to_string()).collect(),
            api_key: Some("sk-test".to_string()),
            api_base: Some("https://x".to_string()),
            api_version: None,
            organization_id: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region_name: None,
            base_model: None,
            extra_params: None,
        }
    }

    #[test]
    fn one_request_per_target_identifier() {
        let mut form = form(ProviderChoice::OpenAICompatible, &["m1", "m2", "m3"]);
        form.base_model = Some("gpt-4".to_string());

        let requests = build_requests(&form).unwrap();

        assert_eq!(requests.len(), 3);

        for (request, target) in requests.iter().zip(["m1", "m2", "m3"]) {
            assert_eq!(request.model_name, "gpt-4-public");
            assert_eq!(request.model_info.base_model.as_deref(), Some("gpt-4"));
            assert_eq!(request.params.get("model"), Some(&json!(target)));
        }
    }

    #[test]
    fn base_model_routes_to_metadata_not_params() {
        let mut form = form(ProviderChoice::Azure, &["azure-gpt4-deployment"]);
        form.api_version = Some("2023-07-01-preview".to_string());
        form.base_model = Some("azure/gpt-4".to_string());

        let requests = build_requests(&form).unwrap();

        assert!(!requests[0].params.contains_key("base_model"));
        assert_eq!(
            requests[0].model_info.base_model.as_deref(),
            Some("azure/gpt-4")
        );
    }

    #[test]
    fn invalid_extra_params_aborts_submission() {
        let mut form = form(ProviderChoice::OpenAI, &["m1", "m2"]);
        form.extra_params = Some("{not json".to_string());

        assert!(matches!(
            build_requests(&form),
            Err(FormError::ExtraParamsInvalid(_))
        ));

        form.extra_params = Some("[1, 2, 3]".to_string());

        assert!(matches!(
            build_requests(&form),
            Err(FormError::ExtraParamsNotObject)
        ));
    }

    #[test]
    fn extra_params_override_explicit_fields() {
        let mut form = form(ProviderChoice::OpenAI, &["m1"]);
        form.extra_params =
            Some(r#"{"api_key": "sk-override", "rpm": 100, "timeout": 0}"#.to_string());

        let requests = build_requests(&form).unwrap();
        let params = &requests[0].params;

        assert_eq!(params.get("api_key"), Some(&json!("sk-override")));
        assert_eq!(params.get("rpm"), Some(&json!(100)));
        assert_eq!(params.get("timeout"), Some(&json!(0)));
    }

    #[test]
    fn openai_compatible_end_to_end_shape() {
        let requests = build_requests(&form(ProviderChoice::OpenAICompatible, &["m1", "m2"]))
            .unwrap();

        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].model_name, "gpt-4-public");
        assert_eq!(requests[0].params.get("api_base"), Some(&json!("https://x")));
        assert_eq!(requests[0].params.get("model"), Some(&json!("m1")));
        assert_eq!(requests[1].params.get("model"), Some(&json!("m2")));
    }

    #[test]
    fn provider_conditional_fields_are_enforced() {
        let mut bedrock = form(ProviderChoice::Bedrock, &["claude-v2"]);
        bedrock.api_key = None;

        // Bedrock authenticates with the AWS triple, not an API key.
        assert!(matches!(
            build_requests(&bedrock),
            Err(FormError::MissingField(ProviderChoice::Bedrock, "aws_access_key_id"))
        ));

        bedrock.aws_access_key_id = Some("AKIA".to_string());
        bedrock.aws_secret_access_key = Some("secret".to_string());
        bedrock.aws_region_name = Some("us-east-1".to_string());

        assert!(build_requests(&bedrock).is_ok());

        let mut azure = form(ProviderChoice::Azure, &["dep"]);
        azure.api_version = None;

        assert!(matches!(
            build_requests(&azure),
            Err(FormError::MissingField(ProviderChoice::Azure, "api_version"))
        ));

        assert!(matches!(
            build_requests(&form(ProviderChoice::OpenAI, &[])),
            Err(FormError::NoModels)
        ));
    }

    /// Records create calls and fails for targets listed in `fail`.
    struct FakeGateway {
        created: Mutex<Vec<String>>,
        fail: Vec<String>,
    }

    impl FakeGateway {
        fn new(fail: &[&str]) -> FakeGateway {
            FakeGateway {
                created: Mutex::new(Vec::new()),
                fail: fail.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl ControlPlane for FakeGateway {
        async fn model_info(&self) -> Result<Vec<ModelRecord>, Error> {
            Ok(Vec::new())
        }

        async fn model_metrics(&self) -> Result<Vec<MetricSample>, Error> {
            Ok(Vec::new())
        }

        async fn pending_requests(&self) -> Result<Vec<PendingRequest>, Error> {
            Ok(Vec::new())
        }

        async fn reference_table(&self) -> Result<ReferenceTable, Error> {
            Ok(ReferenceTable::new())
        }

        async fn create_model(&self, request: &RegistrationRequest) -> Result<(), Error> {
            let target = request
                .params
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap()
                .to_string();

            if self.fail.contains(&target) {
                return Err(Error::from_kind(ErrorKind::BadRequest));
            }

            self.created.lock().unwrap().push(target);

            Ok(())
        }

        async fn delete_model(&self, _model_id: &str) -> Result<(), Error> {
            Ok(())
        }

        async fn health(&self) -> Result<serde_json::Value, Error> {
            Ok(serde_json::Value::Null)
        }
    }

    #[tokio::test]
    async fn batch_collects_outcomes_without_rollback() {
        let gateway = FakeGateway::new(&["m2"]);

        let requests =
            build_requests(&form(ProviderChoice::OpenAICompatible, &["m1", "m2", "m3"])).unwrap();

        let summary = dispatch(&gateway, &requests).await;

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);

        let failed: Vec<&str> = summary
            .outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.target.as_str())
            .collect();

        assert_eq!(failed, ["m2"]);

        // m1 and m3 stay created even though m2 failed.
        let created = gateway.created.lock().unwrap();

        assert!(created.contains(&"m1".to_string()));
        assert!(created.contains(&"m3".to_string()));
    }
}
