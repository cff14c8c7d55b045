//! Projection of raw deployment records into display rows.
//!
//! The projector is a pure transform: it never mutates the fetched
//! records, and projecting the same inputs twice yields identical rows.

use crate::catalog::ProviderCatalog;
use crate::gateway::{DeploymentParams, ModelRecord};

/// Sentinel rendered for optional metadata the proxy did not report.
pub(crate) const UNDEFINED: &str = "undefined";

/// A decorated deployment row. Carries the internal id so a row can be
/// deleted without re-fetching the raw record.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub(crate) struct ModelRow {
    pub model_name: String,
    pub provider: String,
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Connection parameters minus the `model` and `api_base` keys, which
    /// are shown in dedicated columns.
    pub cleaned_params: DeploymentParams,
    pub input_cost: Option<f64>,
    pub output_cost: Option<f64>,
    pub max_tokens: Option<u64>,
}

/// Projects raw records into display rows, resolving each provider label
/// through the catalog. Missing capability metadata degrades to `None`
/// (rendered as [`UNDEFINED`]), never an error.
pub(crate) fn project(records: &[ModelRecord], catalog: &ProviderCatalog) -> Vec<ModelRow> {
    records
        .iter()
        .map(|record| project_record(record, catalog))
        .collect()
}

fn project_record(record: &ModelRecord, catalog: &ProviderCatalog) -> ModelRow {
    let provider = match record.target_model() {
        Some(model) => catalog.resolve_provider(model),
        None => crate::catalog::DEFAULT_PROVIDER.to_string(),
    };

    let info = record.model_info.as_ref();

    let cleaned_params: DeploymentParams = record
        .params
        .iter()
        .filter(|(key, _)| key.as_str() != "model" && key.as_str() != "api_base")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ModelRow {
        model_name: record.model_name.clone(),
        provider,
        model_id: info.and_then(|i| i.id.clone()),
        api_base: record.api_base().map(|s| s.to_string()),
        cleaned_params,
        input_cost: info.and_then(|i| i.input_cost_per_token),
        output_cost: info.and_then(|i| i.output_cost_per_token),
        max_tokens: info.and_then(|i| i.max_tokens),
    }
}
