use crate::cli::connect;
use crate::config::Config;
use crate::gateway::ControlPlane;
use crate::{die, DeleteArgs};

pub(crate) async fn delete_cmd(config: &Config, args: &DeleteArgs) {
    let (gateway, _role) = connect(config);

    // No optimistic bookkeeping: the next listing reflects the deletion.
    match gateway.delete_model(&args.model_id).await {
        Ok(()) => println!("deleted deployment \"{}\"", args.model_id),
        Err(err) => die!("failed to delete deployment \"{}\": {}", args.model_id, err),
    }
}
