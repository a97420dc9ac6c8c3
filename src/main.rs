use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use judge_harness::config;
use judge_harness::core::{exit_codes, CheckMode, CheckOutcome};
use judge_harness::drivers::{self, checker::CheckFiles};
use judge_harness::plugin::SolutionChannel;

/// Plugin drivers of the judge: one invocation, one unit of work
#[derive(Debug, Parser)]
#[command(name = "judge-harness", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a problem's test suite into a working directory
    Generate {
        generator_module: PathBuf,
        work_dir: PathBuf,
    },
    /// Check one test with the context-aware protocol
    Check {
        checker_module: PathBuf,
        work_dir: PathBuf,
        args_file: PathBuf,
        stdin_file: PathBuf,
        output_file: PathBuf,
        answer_file: PathBuf,
    },
    /// Check one test by matching an output file against a reference file
    CheckFiles {
        checker_module: PathBuf,
        work_dir: PathBuf,
        observed_file: PathBuf,
        reference_file: PathBuf,
    },
    /// Check one test with the isolated protocol; both outputs arrive on stdin
    CheckIsolated {
        observed_len: usize,
        standard_len: usize,
        checker_module: PathBuf,
    },
    /// Run an interactive session over this process's stdin/stdout
    Interact {
        interactor_module: PathBuf,
        work_dir: PathBuf,
        input_data: Option<PathBuf>,
    },
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("judge_harness=warn".parse()?),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// Diagnostics go to stdout, which hosts capture
fn report(text: &str) {
    let mut out = io::stdout().lock();
    // Nothing sensible is left to do if stdout is gone
    let _ = writeln!(out, "{}", text).and_then(|_| out.flush());
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn finish_check(outcome: Result<CheckOutcome>, mode: CheckMode) -> ExitCode {
    match outcome {
        Ok(outcome) => {
            if let Some(diagnostic) = outcome.diagnostic() {
                report(diagnostic);
            }
            info!("Check finished: {:?}", outcome);
            exit_with(outcome.exit_code(mode))
        }
        Err(e) => abnormal(e),
    }
}

fn abnormal(e: anyhow::Error) -> ExitCode {
    error!("Driver failed: {:#}", e);
    report(&format!("{:#}", e));
    exit_with(exit_codes::ABNORMAL)
}

fn run(command: Command) -> ExitCode {
    match command {
        Command::Generate {
            generator_module,
            work_dir,
        } => match drivers::generator::run(&generator_module, &work_dir) {
            Ok(report) => {
                info!("Generated {} tests", report.tests_count);
                exit_with(exit_codes::MATCH)
            }
            Err(e) => abnormal(e),
        },
        Command::Check {
            checker_module,
            work_dir,
            args_file,
            stdin_file,
            output_file,
            answer_file,
        } => {
            let files = CheckFiles {
                module: checker_module,
                work_dir,
                arguments: args_file,
                stdin: stdin_file,
                output: output_file,
                answer: answer_file,
            };
            finish_check(
                drivers::checker::check_with_context(&files),
                CheckMode::ContextAware,
            )
        }
        Command::CheckFiles {
            checker_module,
            work_dir,
            observed_file,
            reference_file,
        } => finish_check(
            drivers::checker::check_files(&checker_module, &work_dir, &observed_file, &reference_file),
            CheckMode::ContextAware,
        ),
        Command::CheckIsolated {
            observed_len,
            standard_len,
            checker_module,
        } => {
            let outcome = std::env::current_dir()
                .context("Failed to resolve working directory")
                .and_then(|work_dir| {
                    drivers::checker::check_isolated(
                        observed_len,
                        standard_len,
                        &checker_module,
                        &work_dir,
                        &mut io::stdin().lock(),
                    )
                });
            finish_check(outcome, CheckMode::Isolated)
        }
        Command::Interact {
            interactor_module,
            work_dir,
            input_data,
        } => match drivers::interactor::run(
            &interactor_module,
            &work_dir,
            input_data.as_deref(),
            SolutionChannel::stdio(),
        ) {
            Ok(()) => exit_with(exit_codes::MATCH),
            Err(e) => abnormal(e),
        },
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                exit_with(exit_codes::USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    dotenvy::dotenv().ok();

    if let Err(e) = config::init_config() {
        return abnormal(e);
    }

    run(cli.command)
}
