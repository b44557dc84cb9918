mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use dnsmasq_admin::{ControlService, ControlSettings};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = ControlSettings::from_env(cli.settings.as_deref())?;
    let config = Arc::new(settings.resolve()?);
    let service = Arc::new(ControlService::from_config(config));

    let succeeded = match cli.command {
        Commands::Serve { listen } => commands::serve::cmd_serve(service, listen.as_deref()).await?,
        Commands::Status => commands::daemon::cmd_status(&service).await?,
        Commands::Restart => commands::daemon::cmd_restart(&service).await?,
        Commands::Leases => commands::daemon::cmd_leases(&service).await?,
        Commands::ShowConfig => commands::config::cmd_show(&service).await?,
        Commands::Check { file } => commands::config::cmd_check(&service, &file).await?,
        Commands::Apply { file, restart } => {
            commands::config::cmd_apply(&service, &file, restart).await?
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
