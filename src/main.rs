use clap::Parser;
use couple_ledger::args::{Args, Command};
use couple_ledger::store::DataService;
use couple_ledger::{clock, commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().ledger_home().path();

    // This allows for running the program without hitting the Google APIs. When
    // LEDGER_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Testing,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    if let Command::Init(init_args) = args.command() {
        commands::init(home, init_args).await?.print();
        return Ok(());
    }

    let config = Config::load(home).await?;
    if let Command::Mcp = args.command() {
        commands::mcp(config, mode).await?.print();
        return Ok(());
    }

    let service = DataService::open(&config, mode, clock::system()).await?;
    let participants = config.participants();
    let _: () = match args.command() {
        Command::List(list_args) => commands::list(&service, list_args.month()).await?.print(),
        Command::Add(fields) => commands::add(&service, participants, fields)
            .await?
            .print(),
        Command::Update(update_args) => commands::update(&service, participants, update_args)
            .await?
            .print(),
        Command::Delete(delete_args) => commands::delete(&service, delete_args.id())
            .await?
            .print(),
        Command::Stats(stats_args) => commands::stats(&service, stats_args.month())
            .await?
            .print(),
        Command::Version => commands::version(&service).await?.print(),
        Command::Init(_) | Command::Mcp => {}
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the library and this binary.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_CRATE_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
