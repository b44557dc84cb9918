use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dnsmasq-admin")]
#[command(version)]
#[command(about = "Remote administration for a dnsmasq instance", long_about = None)]
pub(crate) struct Cli {
    /// Settings file (TOML). Can also be set via DNSMASQ_ADMIN_SETTINGS env var.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Serve the HTTP control API
    Serve {
        /// Address to listen on (overrides settings)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Show daemon status
    Status,

    /// Print the current dnsmasq configuration
    ShowConfig,

    /// Dry-run syntax check of a candidate configuration
    Check {
        /// Candidate file ("-" reads stdin)
        file: PathBuf,
    },

    /// Validate and install a configuration
    Apply {
        /// Candidate file ("-" reads stdin)
        file: PathBuf,

        /// Restart the daemon after a successful apply
        #[arg(long)]
        restart: bool,
    },

    /// Restart the daemon
    Restart,

    /// List active DHCP leases
    Leases,
}
