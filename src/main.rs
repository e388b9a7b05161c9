use clap::Parser;

use repolift::{cli, telemetry};

fn main() {
    let cli = cli::Cli::parse();
    telemetry::init(cli.verbose);

    if let Err(e) = cli::run(cli) {
        tracing::error!("error: {e}");
        std::process::exit(1);
    }
}
