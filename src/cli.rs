use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "strut")]
#[command(author = "Strut Team")]
#[command(version = "0.1.0")]
#[command(about = "Synchronized choreography relay and robot agent", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory path
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server
    Serve {
        /// Bind address override (e.g. "0.0.0.0:8000")
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run a robot agent process
    Agent {
        /// Agent identity (e.g. "605")
        id: String,
        /// Shared passcode
        passcode: String,
        /// Relay URL override (e.g. "ws://127.0.0.1:8000")
        #[arg(short, long)]
        relay: Option<String>,
    },
}
