use clap::Parser;
use strut::agent::AgentClient;
use strut::cli::{Cli, Commands};
use strut::config::AppConfig;
use strut::domain::ConsoleActuator;
use strut::error::Result;
use strut::relay::RelayServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = AppConfig::load_from(&cli.config)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.relay.bind = bind;
            }
            RelayServer::new(&config.relay).run().await?;
        }
        Commands::Agent { id, passcode, relay } => {
            if let Some(relay) = relay {
                config.agent.relay_url = relay;
            }
            let mut client = AgentClient::new(&config, id, passcode, ConsoleActuator);
            client.run().await?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,strut=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
