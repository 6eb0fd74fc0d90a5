use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ror_runner::{
    build_roof, load_config, run, run_once, shutdown_flag, OneShot, Overrides, RunnerConfig,
    RunnerError,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rord", version, about = "Roll-off roof controller daemon")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial device of the roof controller.
    #[arg(long, global = true)]
    port: Option<String>,

    /// Serial speed.
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Reach the controller through a serial-over-TCP bridge at host:port.
    #[arg(long, global = true, conflicts_with = "port")]
    tcp: Option<String>,

    /// Run against a simulated roof.
    #[arg(long, global = true)]
    simulate: bool,

    /// Seconds allowed for the roof to open or close (1-300).
    #[arg(long, global = true)]
    timeout: Option<u32>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Poll the roof until interrupted. The default.
    Run,
    /// Open the roof and wait for it to finish.
    Open,
    /// Close the roof and wait for it to finish.
    Close,
    /// Stop the roof.
    Abort,
    /// Print the roof status as JSON.
    Status,
    /// Load and validate a configuration file.
    CheckConfig { file: PathBuf },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<RunnerConfig, RunnerError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RunnerConfig::default(),
    };
    config.apply(&Overrides {
        port: cli.port.clone(),
        baud_rate: cli.baud,
        tcp: cli.tcp.clone(),
        simulate: cli.simulate,
        timeout: cli.timeout,
    });
    config.validate()?;
    Ok(config)
}

fn check_config(path: &Path) -> Result<(), RunnerError> {
    let config = load_config(path)?;
    info!("{} is valid, transport {:?}", path.display(), config.transport);
    Ok(())
}

fn execute(cli: Cli) -> Result<(), RunnerError> {
    let command = cli.command.clone().unwrap_or(Command::Run);
    if let Command::CheckConfig { file } = &command {
        return check_config(file);
    }

    let config = resolve_config(&cli)?;
    let running = shutdown_flag()?;
    let mut roof = build_roof(&config)?;

    let one_shot = match command {
        Command::Run => return run(&mut roof, &running),
        Command::Open => OneShot::Open,
        Command::Close => OneShot::Close,
        Command::Abort => OneShot::Abort,
        Command::Status => OneShot::Status,
        Command::CheckConfig { .. } => return Ok(()),
    };
    let status = run_once(&mut roof, one_shot, &running)?;
    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to format status: {}", e),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
