use super::args::*;

pub mod audit;
pub mod fetch;
pub(crate) mod gather;

use crate::exit_codes::EXIT_SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Audit(args) => audit::run(args).await,
        Command::Fetch(args) => fetch::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(EXIT_SUCCESS)
        }
    }
}
