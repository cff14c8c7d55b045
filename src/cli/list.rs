use table::{IntoTable, Table};
mod table;

use crate::catalog::ProviderCatalog;
use crate::cli::connect;
use crate::config::{Config, UserRole};
use crate::gateway::{ControlPlane, MetricSample, PendingRequest};
use crate::view::{self, ModelRow, UNDEFINED};
use crate::{die, warn, ListArgs, ListObject, ListingFormat};

/// The decorated deployment listing. The endpoint column is restricted to
/// admins, as in the dashboard.
struct ModelListing {
    rows: Vec<ModelRow>,
    show_api_base: bool,
}

impl serde::Serialize for ModelListing {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

fn cost_cell(cost: Option<f64>) -> String {
    match cost {
        Some(cost) => format!("{}", cost),
        None => UNDEFINED.to_string(),
    }
}

impl From<ModelListing> for Table {
    fn from(value: ModelListing) -> Self {
        let mut tab = Table::new();

        let mut header = vec!["NAME", "PROVIDER", "ID"];

        if value.show_api_base {
            header.push("API_BASE");
        }

        header.extend(["PARAMS", "INPUT_COST", "OUTPUT_COST", "MAX_TOKENS"]);

        tab.set_header(header);

        for row in value.rows {
            let mut cells = vec![
                row.model_name,
                row.provider,
                row.model_id.unwrap_or_else(|| UNDEFINED.to_string()),
            ];

            if value.show_api_base {
                cells.push(row.api_base.unwrap_or_else(|| UNDEFINED.to_string()));
            }

            let params = serde_json::to_string(&row.cleaned_params)
                .expect("failed to seralize deployment params");

            cells.push(params);
            cells.push(cost_cell(row.input_cost));
            cells.push(cost_cell(row.output_cost));
            cells.push(match row.max_tokens {
                Some(max_tokens) => max_tokens.to_string(),
                None => UNDEFINED.to_string(),
            });

            tab.add_row(cells);
        }

        tab
    }
}

impl From<Vec<MetricSample>> for Table {
    fn from(value: Vec<MetricSample>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["MODEL", "REQUESTS", "AVG_LATENCY_SECONDS"]);

        for sample in value {
            tab.add_row(vec![
                sample.model,
                sample.num_requests.to_string(),
                format!("{:.3}", sample.avg_latency_seconds),
            ]);
        }

        tab
    }
}

impl From<Vec<PendingRequest>> for Table {
    fn from(value: Vec<PendingRequest>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["REQUEST", "USER", "MODELS", "JUSTIFICATION"]);

        for request in value {
            tab.add_row(vec![
                request.request_id,
                request.user_id,
                request.models.join(","),
                request.justification.unwrap_or_default(),
            ]);
        }

        tab
    }
}

fn format_output<O: IntoTable + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => {
            let output = serde_json::to_string_pretty(&object).expect("failed to seralize object");

            println!("{}", output);
        }
        ListingFormat::Table => {
            let tab = object.into_table();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

/// The endpoint is admin-only in every output format; for other roles it
/// is dropped from the rows before rendering.
fn redact_api_base(rows: &mut [ModelRow]) {
    for row in rows {
        row.api_base = None;
    }
}

async fn get_model_listing<G: ControlPlane>(gateway: &G, role: UserRole) -> ModelListing {
    let records = match gateway.model_info().await {
        Ok(records) => records,
        Err(err) => die!("failed to list models: {}", err),
    };

    // A missing reference table degrades the provider labels, it never
    // fails the listing.
    let catalog = match gateway.reference_table().await {
        Ok(table) => ProviderCatalog::new(table),
        Err(err) => {
            warn!("failed to fetch the model reference table: {}", err);

            ProviderCatalog::unloaded()
        }
    };

    let mut rows = view::project(&records, &catalog);

    let show_api_base = role == UserRole::Admin;

    if !show_api_base {
        redact_api_base(&mut rows);
    }

    ModelListing {
        rows,
        show_api_base,
    }
}

pub(crate) async fn list_cmd(config: &Config, args: &ListArgs) {
    let format = args.format;

    let (gateway, role) = connect(config);

    match &args.object {
        ListObject::Models => {
            if role == UserRole::AdminViewer {
                die!("access denied: ask your proxy admin for access to view all models");
            }

            let listing = get_model_listing(&gateway, role).await;

            format_output(listing, format);
        }
        ListObject::Metrics => {
            let metrics = match gateway.model_metrics().await {
                Ok(metrics) => metrics,
                Err(err) => die!("failed to fetch model metrics: {}", err),
            };

            format_output(metrics, format);
        }
        ListObject::Requests => {
            if role != UserRole::Admin {
                die!("access denied: only admins can view pending access requests");
            }

            let requests = match gateway.pending_requests().await {
                Ok(requests) => requests,
                Err(err) => die!("failed to fetch pending access requests: {}", err),
            };

            format_output(requests, format);
        }
    }
}
