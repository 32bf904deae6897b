use clap::ArgMatches;
use tracing::{error, info};

mod config;
mod plan;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        event = "cli.app.started",
        version = env!("CARGO_PKG_VERSION")
    );

    let result = match matches.subcommand() {
        Some(("plan", sub_matches)) => plan::handle_plan_command(sub_matches),
        Some(("config", sub_matches)) => config::handle_config_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    };

    match &result {
        Ok(()) => info!(event = "cli.app.completed"),
        Err(e) => error!(event = "cli.app.failed", error = %e),
    }
    result
}
