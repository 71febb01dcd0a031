//! Print the access configuration

use clap::{Args, ValueEnum};
use rolegate_service::{ConfigClient, ServiceHandle};

use crate::error::CliResult;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Section {
    Roles,
    Markers,
    Access,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Print only one section
    #[arg(long, value_enum)]
    pub section: Option<Section>,
}

pub async fn execute(args: ShowArgs, client: &ServiceHandle) -> CliResult<()> {
    let config = client.load_config().await?;
    let json = match args.section {
        None => serde_json::to_string_pretty(&config)?,
        Some(Section::Roles) => serde_json::to_string_pretty(&config.roles)?,
        Some(Section::Markers) => serde_json::to_string_pretty(&config.markers)?,
        Some(Section::Access) => serde_json::to_string_pretty(&config.access)?,
    };
    println!("{}", json);
    Ok(())
}
