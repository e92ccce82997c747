//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], [`validate`], or [`health`].
//! Each handler lives in its own submodule.

pub mod health;
pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::RelayError;

pub async fn dispatch(cli: Cli) -> Result<(), RelayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  adsb-relay v{version}: dump1090 filter and fan-out relay\n\n  \
         No command provided. To get started:\n\n    \
         adsb-relay init                 Generate a starter config\n    \
         adsb-relay run                  Start the relay (./adsb_server_config.conf)\n    \
         adsb-relay run -c relay.conf    Start with a specific config file\n    \
         adsb-relay --help               See all commands and options\n"
    );
}
