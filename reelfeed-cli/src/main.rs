mod cli;
mod commands;
mod config;
mod error;

use std::path::Path;
use std::process;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    error::{AppError, Result},
};
use clap::Parser;
use tracing::{Level, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = match init_logging(args.verbose, args.quiet, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = config::load(args.config.as_deref())?;
    if let Some(api_base) = args.api_base {
        config.http.api_base = api_base;
    }
    if args.token.is_some() {
        config.http.auth_token = args.token;
    }

    if let Commands::Config = args.command {
        println!("{}", config::show(&config)?);
        return Ok(());
    }

    let executor = CommandExecutor::new(config)?;

    match args.command {
        Commands::Feed {
            force,
            per_page,
            output,
        } => executor.feed(force, per_page, output).await?,

        Commands::Warmup {
            urls,
            bytes,
            timeout_ms,
        } => executor.warmup(&urls, bytes, timeout_ms).await?,

        Commands::Subtitles {
            master_url,
            language,
            at,
            output,
        } => {
            executor
                .subtitles(&master_url, language.as_deref(), at, output)
                .await?
        }

        Commands::Like { id, property } => executor.like(&id, property).await?,

        Commands::Likes => executor.likes().await?,

        Commands::Config => {}
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| AppError::InvalidInput(format!("not a file path: {}", path.display())))?;
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(file_layer)
        .init();
    Ok(guard)
}
