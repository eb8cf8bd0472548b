//! rate-gate CLI entry point.
//!
//! ## CLI Subcommands
//!
//! - `rate-gate-cli simulate [--requests N]` - Run synthetic load, print metrics JSON
//! - `rate-gate-cli config show|defaults|validate [--file PATH]`
//! - `rate-gate-cli help` / `version`

use std::process::ExitCode;

use rate_gate::cli::{self, config_cmd, flag_value, DEFAULT_SIMULATED_REQUESTS};
use rate_gate::config;
use rate_gate::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match command {
        "simulate" => run_simulate(&args).await,
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            let file = flag_value(&args, "--file");
            match subcommand {
                "show" => ExitCode::from(config_cmd::run_show(file) as u8),
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => ExitCode::from(config_cmd::run_validate(file) as u8),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_usage();
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("rate-gate {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

async fn run_simulate(args: &[String]) -> ExitCode {
    let env = config::load();
    if let Err(e) = telemetry::init_logging(&env.log) {
        eprintln!("Logging setup failed: {}", e);
        return ExitCode::FAILURE;
    }

    let scheduler_config = match flag_value(args, "--file") {
        Some(path) => match config::load_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => env.scheduler,
    };

    let requests = match flag_value(args, "--requests").map(str::parse::<usize>) {
        None => DEFAULT_SIMULATED_REQUESTS,
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            eprintln!("--requests expects a positive integer");
            return ExitCode::FAILURE;
        }
    };

    let report = cli::run_simulation(scheduler_config, requests).await;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to encode report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if report.interrupted {
        ExitCode::from(130u8)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_usage() {
    println!("rate-gate {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    rate-gate-cli <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    simulate [--requests N] [--file PATH]   Run synthetic load and print metrics");
    println!("    config show [--file PATH]               Show effective configuration");
    println!("    config defaults                         Show default configuration");
    println!("    config validate [--file PATH]           Check configuration for problems");
    println!("    help                                    Show this message");
    println!("    version                                 Show version");
}
