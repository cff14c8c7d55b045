use crate::catalog::ProviderCatalog;
use crate::cli::connect;
use crate::config::Config;
use crate::gateway::ControlPlane;
use crate::register::{build_requests, dispatch, RegistrationForm};
use crate::{die, error, warn, AddArgs};

impl From<&AddArgs> for RegistrationForm {
    fn from(args: &AddArgs) -> Self {
        RegistrationForm {
            model_name: args.name.clone(),
            provider: args.provider,
            models: args.models.clone(),
            api_key: args.api_key.clone(),
            api_base: args.api_base.clone(),
            api_version: args.api_version.clone(),
            organization_id: args.organization_id.clone(),
            aws_access_key_id: args.aws_access_key_id.clone(),
            aws_secret_access_key: args.aws_secret_access_key.clone(),
            aws_region_name: args.aws_region_name.clone(),
            base_model: args.base_model.clone(),
            extra_params: args.extra_params.clone(),
        }
    }
}

/// Warns when a selected identifier is not one the reference table files
/// under the chosen provider. Free-text identifiers stay allowed, matching
/// the dashboard's fallback input.
fn warn_on_unknown_models(form: &RegistrationForm, catalog: &ProviderCatalog) {
    let known = catalog.models_for_provider(form.provider.route_key());

    if known.is_empty() {
        return;
    }

    for model in &form.models {
        if !known.contains(model) {
            warn!(
                "model \"{}\" is not a known \"{}\" model in the reference table",
                model, form.provider
            );
        }
    }
}

pub(crate) async fn add_cmd(config: &Config, args: &AddArgs) {
    let (gateway, _role) = connect(config);

    let form = RegistrationForm::from(args);

    let catalog = match gateway.reference_table().await {
        Ok(table) => ProviderCatalog::new(table),
        Err(err) => {
            warn!("failed to fetch the model reference table: {}", err);

            ProviderCatalog::unloaded()
        }
    };

    warn_on_unknown_models(&form, &catalog);

    // Validation failures abort the submission before anything is sent.
    let requests = match build_requests(&form) {
        Ok(requests) => requests,
        Err(err) => die!("{}", err),
    };

    let summary = dispatch(&gateway, &requests).await;

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(()) => println!("registered \"{}\"", outcome.target),
            Err(err) => error!("failed to register \"{}\": {}", outcome.target, err),
        }
    }

    if summary.failed() > 0 {
        // Created deployments are not rolled back on partial failure.
        die!(
            "{} of {} deployments failed to register under \"{}\"",
            summary.failed(),
            summary.outcomes.len(),
            form.model_name
        );
    }

    println!(
        "registered {} deployment(s) under \"{}\"",
        summary.succeeded(),
        form.model_name
    );
}
