use std::env;
use std::process::ExitCode;

use rawsh::config::ShellConfig;
use rawsh::{Shell, ShellError};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rawsh=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> anyhow::Result<()> {
    let start_dir = env::current_dir().map_err(ShellError::CurrentDir)?;
    let mut shell = Shell::interactive(ShellConfig::from_env(), start_dir);
    shell.run();
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rawsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
