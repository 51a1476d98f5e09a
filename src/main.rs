use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use schema_validate::{Cli, ConfigManager, Error, Options, dispatch, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => return report(Error::InvalidOption(e.to_string())),
    };

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

async fn run(cli: &Cli) -> schema_validate::Result<()> {
    // Option errors win over anything a config file could raise.
    let options = Options::from_cli(cli)?;

    let config = ConfigManager::load_config(cli).await?;
    logging::init(&config.logging);
    tracing::debug!(?options, "options loaded");

    dispatch::run(&options, &config, std::io::stdout().lock()).await
}

fn report(error: Error) -> ExitCode {
    tracing::debug!(%error, "validation aborted");
    eprintln!("Error: {}", error.to_string().trim_end());
    if error.is_argument_error() {
        eprintln!("Run 'schema-validate --help' for usage.");
    }
    ExitCode::from(error.exit_code())
}
