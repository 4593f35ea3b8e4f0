use clap::{Parser, Subcommand};

/// signoff — human-approval gateway for privileged actions
#[derive(Parser)]
#[command(name = "signoff", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the approval gateway server
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}
