use anyhow::Result;
use clap::Parser;
use relay_cli::{init_tracing, inspect_store, run_once, run_relay, Cli, CliCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.log_file_append)?;
    let config = cli.relay_config();
    match cli.command() {
        CliCommand::Run => run_relay(&config).await,
        CliCommand::Once => {
            let report = run_once(&config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        CliCommand::Inspect => {
            println!("{}", inspect_store(&config.state_path)?);
            Ok(())
        }
    }
}
