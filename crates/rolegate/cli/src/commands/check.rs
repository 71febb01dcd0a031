//! Evaluate markers for a role the way the runtime enforcer would

use std::sync::Arc;

use clap::Args;
use rolegate_enforcer::Enforcer;
use rolegate_hierarchy::flatten_forest;
use rolegate_service::ServiceHandle;
use rolegate_types::Principal;

use crate::config::RolegateConfig;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Role of the principal; omit to check a signed-out session
    #[arg(long)]
    pub role: Option<String>,

    /// Marker ids to check; defaults to every marker in the forest
    pub markers: Vec<String>,
}

pub async fn execute(
    args: CheckArgs,
    config: &RolegateConfig,
    client: &ServiceHandle,
) -> CliResult<()> {
    let enforcer = Enforcer::new(&config.enforcer, Arc::new(client.clone()));
    enforcer.initialize().await?;
    enforcer
        .context()
        .set_principal(args.role.map(Principal::new))?;

    let markers = if args.markers.is_empty() {
        match enforcer.context().config_snapshot()? {
            Some(config) => flatten_forest(&config.markers)
                .into_iter()
                .map(|decl| decl.id.as_str().to_string())
                .collect(),
            None => Vec::new(),
        }
    } else {
        args.markers
    };

    for marker in &markers {
        let verdict = if enforcer.check_access(marker) {
            "allow"
        } else {
            "deny"
        };
        println!("{:<6} {}", verdict, marker);
    }

    enforcer.teardown().await?;
    Ok(())
}
