//! Provider resolution over the static model reference table.
//!
//! The proxy identifies an upstream by the target model identifier alone.
//! Identifiers either carry an explicit provider prefix (`azure/gpt-4`) or
//! are canonical names the reference table attributes to a provider. The
//! [`ProviderCatalog`] wraps the fetched table and answers both directions:
//! which provider owns an identifier, and which identifiers belong to a
//! provider.

use crate::gateway::{ReferenceEntry, ReferenceTable};

/// The label used when neither the identifier nor the reference table
/// names a provider.
pub(crate) const DEFAULT_PROVIDER: &str = "openai";

pub(crate) struct ProviderCatalog {
    table: Option<ReferenceTable>,
}

impl ProviderCatalog {
    /// A catalog over a fetched reference table.
    pub(crate) fn new(table: ReferenceTable) -> ProviderCatalog {
        ProviderCatalog { table: Some(table) }
    }

    /// A catalog for use before the reference table is available. Every
    /// bare identifier resolves to the default provider.
    pub(crate) fn unloaded() -> ProviderCatalog {
        ProviderCatalog { table: None }
    }

    fn entry(&self, model: &str) -> Option<&ReferenceEntry> {
        self.table.as_ref().and_then(|table| table.get(model))
    }

    /// Resolves the provider label for a model identifier.
    ///
    /// An identifier with a path-style separator names its provider
    /// explicitly in the first segment. Otherwise the bare identifier is
    /// looked up in the reference table. Absence of the table or of an
    /// entry degrades to [`DEFAULT_PROVIDER`], never an error.
    pub(crate) fn resolve_provider(&self, model: &str) -> String {
        if let Some((prefix, _)) = model.split_once('/') {
            return prefix.to_string();
        }

        self.entry(model)
            .and_then(|entry| entry.litellm_provider.clone())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    /// Canonical identifiers the reference table attributes to the given
    /// provider route key. Used to constrain the selectable identifiers
    /// when registering a deployment.
    pub(crate) fn models_for_provider(&self, route_key: &str) -> Vec<String> {
        let mut models: Vec<String> = match &self.table {
            Some(table) => table
                .iter()
                .filter(|(_, entry)| entry.litellm_provider.as_deref() == Some(route_key))
                .map(|(id, _)| id.clone())
                .collect(),
            None => Vec::new(),
        };

        models.sort();

        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table() -> ReferenceTable {
        let mut table = HashMap::new();

        table.insert(
            "gpt-4".to_string(),
            ReferenceEntry {
                litellm_provider: Some("openai".to_string()),
                ..Default::default()
            },
        );
        table.insert(
            "claude-3-opus".to_string(),
            ReferenceEntry {
                litellm_provider: Some("anthropic".to_string()),
                ..Default::default()
            },
        );
        table.insert(
            "gemini-pro".to_string(),
            ReferenceEntry {
                litellm_provider: Some("gemini".to_string()),
                ..Default::default()
            },
        );

        table
    }

    #[test]
    fn prefixed_identifier_wins_over_table() {
        let catalog = ProviderCatalog::new(table());

        // The first path segment is authoritative even when the table
        // attributes the bare name elsewhere.
        assert_eq!(catalog.resolve_provider("azure/gpt-4"), "azure");
        assert_eq!(catalog.resolve_provider("bedrock/claude-3-opus"), "bedrock");
    }

    #[test]
    fn prefixed_identifier_resolves_without_table() {
        let catalog = ProviderCatalog::unloaded();

        assert_eq!(catalog.resolve_provider("azure/gpt-4"), "azure");
    }

    #[test]
    fn bare_identifier_resolves_from_table() {
        let catalog = ProviderCatalog::new(table());

        assert_eq!(catalog.resolve_provider("claude-3-opus"), "anthropic");
    }

    #[test]
    fn unknown_identifier_defaults() {
        let catalog = ProviderCatalog::new(table());

        assert_eq!(catalog.resolve_provider("mystery-model"), DEFAULT_PROVIDER);
    }

    #[test]
    fn missing_table_defaults() {
        let catalog = ProviderCatalog::unloaded();

        assert_eq!(catalog.resolve_provider("claude-3-opus"), DEFAULT_PROVIDER);
    }

    #[test]
    fn models_for_provider_filters_table() {
        let catalog = ProviderCatalog::new(table());

        assert_eq!(catalog.models_for_provider("anthropic"), ["claude-3-opus"]);
        assert!(catalog.models_for_provider("mistral").is_empty());
        assert!(ProviderCatalog::unloaded()
            .models_for_provider("openai")
            .is_empty());
    }
}
