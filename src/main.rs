mod cli;
mod config;
mod progress;
mod runner;
mod steps;
mod sudo;
mod ui;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use converge::{Elevation, StepContext};
use std::io;

use config::{FileValues, TerminalPrompter};
use progress::Reporter;
use runner::SystemRunner;
use sudo::SudoSession;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if cli.list_steps {
        list_steps();
        return Ok(());
    }

    provision(&cli)
}

fn provision(cli: &Cli) -> Result<()> {
    if !runner::command_exists("apt-get") {
        bail!("apt-get not found - stackup provisions Ubuntu hosts only");
    }

    let file = match config::locate_env_file(cli.env_file.as_deref())? {
        Some(path) => {
            log::info!("loading settings from {}", path.display());
            FileValues::load(&path)?
        }
        None => FileValues::default(),
    };

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let settings = config::resolve(
        |key| std::env::var(key).ok(),
        &file,
        &mut TerminalPrompter,
        home,
    )?;

    let elevation = sudo::detect();

    if !cli.quiet {
        ui::header("stackup - web stack provisioning");
        ui::kv("database", &settings.db_name);
        ui::kv("user", &settings.db_user);
        ui::kv("domain", &settings.certificate_names().join(", "));
        ui::kv(
            "privilege",
            match elevation {
                Elevation::Direct => "running as root",
                Elevation::Sudo => "via sudo",
            },
        );
        println!();
    }

    // Checks need root too, so a dry run still validates sudo.
    let _session = SudoSession::acquire(elevation, "install packages and configure services")?;

    let ctx = StepContext::new(&SystemRunner, elevation).with_dry_run(cli.dry_run);
    let steps = steps::catalog(&settings);
    let mut reporter = Reporter::new(io::stdout(), cli.quiet);

    let report = converge::run(&steps, &ctx, &mut reporter);

    if let Some(failed) = report.failure() {
        ui::error(&format!("Provisioning stopped at step '{}'", failed.name));
        bail!("step '{}' failed", failed.name);
    }

    if !cli.quiet {
        if cli.dry_run {
            ui::info("Dry run - no changes made");
        } else if report.applied() == 0 {
            ui::success("Nothing to do - host is already provisioned");
        } else {
            ui::success("Host provisioned");
            ui::warn("Open a new shell (or source ~/.bashrc) to pick up PATH changes");
        }
    }

    Ok(())
}

fn list_steps() {
    ui::header("Provisioning steps");
    println!();
    for (index, (name, summary)) in steps::OVERVIEW.iter().enumerate() {
        println!(
            "  {} {:<15} {}",
            format!("{}.", index + 1).dimmed(),
            name.bold(),
            summary.dimmed()
        );
    }
}
