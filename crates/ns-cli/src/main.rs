use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ns_cli::commands::util::Session;
use ns_cli::commands::{adjust, delete_night, fix, merge, nights, record, split};
use ns_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(ns_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = ns_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn dispatch<W, Tz>(writer: &mut W, command: &Commands, session: &mut Session<'_, Tz>) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match command {
        Commands::Start { at } => record::start(writer, session, at.as_deref()),
        Commands::Stop { at } => record::stop(writer, session, at.as_deref()),
        Commands::Add { start, end } => record::add(writer, session, start, end),
        Commands::Nights { json, limit } => nights::run(writer, session, *json, *limit),
        Commands::Adjust {
            edge,
            night,
            wake,
            to,
        } => adjust::run(writer, session, *edge, *night, *wake, to),
        Commands::Split {
            night,
            at,
            wake_minutes,
        } => split::run(writer, session, *night, at, *wake_minutes),
        Commands::Merge { night, wake } => merge::run(writer, session, *night, *wake),
        Commands::Fix { night, apply } => fix::run(writer, session, *night, *apply),
        Commands::DeleteNight { night } => delete_night::run(writer, session, *night),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let now = Utc::now();
    let mut stdout = std::io::stdout().lock();

    match config.fixed_offset()? {
        Some(tz) => {
            let mut session = Session {
                db: &mut db,
                tz,
                now,
                scheduler: config.scheduler(),
            };
            dispatch(&mut stdout, command, &mut session)
        }
        None => {
            let mut session = Session {
                db: &mut db,
                tz: Local,
                now,
                scheduler: config.scheduler(),
            };
            dispatch(&mut stdout, command, &mut session)
        }
    }
}
