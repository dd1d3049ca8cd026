mod actions;
mod args;
mod classifier;
mod config;
mod hasher;
mod interner;
mod levels;
mod matcher;
mod output;
mod pool;
mod scanner;
mod statistics;
mod utils;

use anyhow::Context;
use args::Args;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, error, info};
use output::{Reporter, save_results_json};
use scanner::run_scan;
use statistics::ScanResults;
use std::io::{self, BufRead, BufWriter, IsTerminal};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use utils::Cancel;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cancel = Cancel::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_cancel.cancel() {
            std::process::exit(130);
        }
        eprintln!("\nInterrupted by user, finishing current work...");
    })
    .context("Failed to set signal handler")?;

    let log_level = if args.verbose {
        args.log_level.max(LevelFilter::Info)
    } else {
        args.log_level
    };
    env_logger::builder()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    let (config, errors) = Config::from_args(&args);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{}", e.red());
        }
        Args::command().print_help()?;
        return Ok(());
    }

    if config.use_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let roots: Vec<PathBuf> = if config.from_stdin {
        io::stdin()
            .lock()
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect()
    } else {
        args.paths.iter().map(PathBuf::from).collect()
    };

    let progress = if config.quiet > 0 || !io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .context("Invalid progress template")?,
        );
        spinner.set_message("Scanning files...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };

    let start_time = Instant::now();
    if config.quiet < 2 {
        eprintln!("\n{}", "+Start".green());
    }
    info!("Scanning {} roots", roots.len());

    let stdout = io::stdout();
    let mut reporter = Reporter::new(&config, BufWriter::new(stdout.lock()));
    let levels = match run_scan(&config, &roots, &mut reporter, &cancel, &progress) {
        Ok(levels) => levels,
        Err(e) => {
            error!("Scan failed: {:#}", e);
            0
        }
    };
    progress.finish_and_clear();
    let (counters, groups) = reporter.finish()?;
    let duration = start_time.elapsed().as_secs_f64();

    if config.quiet < 2 {
        let summary = format!(
            "+Levels={} Dup={} Diff={} Miss={} Skip={} Files={}",
            levels,
            counters.same,
            counters.diff,
            counters.miss,
            counters.skip,
            counters.total()
        );
        eprintln!("{}", summary.green());
        if counters.delete_errors > 0 {
            eprintln!(
                "{}",
                format!("+Delete errors={}", counters.delete_errors).red()
            );
        }
    }

    if let Some(json_path) = &args.output_json {
        let results = ScanResults::new(&counters, levels, duration, groups);
        save_results_json(json_path, &results)?;
        info!("Results saved to {}", json_path.display());
    }

    if config.quiet < 2 {
        eprintln!(
            "{}",
            format!("+End, Elapsed {:.2} (sec)", duration).green()
        );
    }

    Ok(())
}
