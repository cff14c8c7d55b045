mod catalog;
mod cli;
mod config;
mod gateway;
mod register;
mod utils;
mod view;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{add::add_cmd, delete::delete_cmd, health::health_cmd, list::list_cmd, ColorMode};
use register::ProviderChoice;
use std::path::PathBuf;

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "modelctl")]
#[command(
    about = "A CLI for managing model deployments on an LLM proxy",
    version = "0.0.1"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Use the specified config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List objects configured on the proxy
    List(ListArgs),
    /// Register a new model deployment
    Add(AddArgs),
    /// Delete a model deployment
    Delete(DeleteArgs),
    /// Run a health check across the proxy's deployments
    Health,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Configured model deployments
    Models,
    /// Per-model usage and latency metrics
    Metrics,
    /// Pending model access requests
    Requests,
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser)]
pub(crate) struct AddArgs {
    /// Public name users will route requests under
    #[arg(short, long)]
    name: String,
    /// Upstream provider for the deployment
    #[arg(short, long)]
    provider: ProviderChoice,
    /// Target model identifier; repeat to create one deployment per identifier
    #[arg(short, long = "model", required = true)]
    models: Vec<String>,
    /// Provider API key
    #[arg(long)]
    api_key: Option<String>,
    /// Provider API base URL
    #[arg(long)]
    api_base: Option<String>,
    /// Provider API version (Azure)
    #[arg(long)]
    api_version: Option<String>,
    /// Organization id (OpenAI)
    #[arg(long)]
    organization_id: Option<String>,
    /// AWS access key id (Bedrock)
    #[arg(long)]
    aws_access_key_id: Option<String>,
    /// AWS secret access key (Bedrock)
    #[arg(long)]
    aws_secret_access_key: Option<String>,
    /// AWS region name (Bedrock)
    #[arg(long)]
    aws_region_name: Option<String>,
    /// Underlying model used for cost tracking (Azure)
    #[arg(long)]
    base_model: Option<String>,
    /// Extra deployment parameters as a JSON object
    #[arg(long)]
    extra_params: Option<String>,
}

#[derive(Parser)]
pub(crate) struct DeleteArgs {
    /// Internal id of the deployment to delete
    model_id: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let color = ColorMode::resolve_auto(cli.color);
    utils::errors::configure_color(color);

    let config = config::read_config(cli.config);

    match &cli.command {
        Commands::List(args) => list_cmd(&config, args).await,
        Commands::Add(args) => add_cmd(&config, args).await,
        Commands::Delete(args) => delete_cmd(&config, args).await,
        Commands::Health => health_cmd(&config).await,
    }
}
