mod commands;
mod terminal;

use commands::{CommandLine, Commands, dns, ports};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet);
    print::banner(commands.no_banner, commands.quiet);

    match commands.command {
        Commands::Ports(args) => {
            print::header("starting port probe", commands.quiet);
            ports::ports(args, commands.quiet).await
        }
        Commands::Dns(args) => {
            print::header("starting dns exploration", commands.quiet);
            dns::dns(args, commands.quiet).await
        }
    }
}
