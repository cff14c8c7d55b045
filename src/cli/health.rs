use crate::cli::connect;
use crate::config::Config;
use crate::gateway::ControlPlane;
use crate::{die, info};

/// Runs a small request through every deployment configured on the proxy
/// and prints the diagnostic payload.
pub(crate) async fn health_cmd(config: &Config) {
    let (gateway, _role) = connect(config);

    info!("running health check...");

    match gateway.health().await {
        Ok(payload) => {
            let output =
                serde_json::to_string_pretty(&payload).expect("failed to seralize health payload");

            println!("{}", output);
        }
        Err(_) => die!("error running health check"),
    }
}
