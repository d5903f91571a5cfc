// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Quill - a small scripting language on a bytecode VM
//!
//! This is the main entry point for the quill CLI/REPL.
//!
//! ## Features
//!
//! - Interactive REPL with syntax highlighting and history
//! - Async file execution with tokio
//! - Bytecode disassembly

mod repl;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use quill_vm::{AsyncEngine, Engine, VmConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    about = "Quill scripting language",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Quill file to execute; starts the REPL when omitted
    file: Option<PathBuf>,

    /// Evaluate code from the command line
    #[arg(short = 'e', long = "eval", value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the compiled bytecode instead of running it
    #[arg(short = 'd', long = "disassemble")]
    disassemble: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Operand stack capacity in values
    #[arg(long, env = "QUILL_STACK_SIZE", default_value_t = quill_vm::config::DEFAULT_STACK_SIZE)]
    stack_size: usize,

    /// Maximum call depth
    #[arg(long, env = "QUILL_MAX_FRAMES", default_value_t = quill_vm::config::DEFAULT_MAX_FRAMES)]
    max_frames: usize,
}

impl Cli {
    fn vm_config(&self) -> VmConfig {
        VmConfig::new()
            .stack_size(self.stack_size)
            .max_frames(self.max_frames)
    }
}

/// Main entry point - uses tokio runtime for async operations.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.vm_config();

    if let Some(code) = &cli.eval {
        return run_eval(code, config, cli.disassemble).await;
    }

    match &cli.file {
        Some(path) => run_file(path, config, cli.disassemble).await,
        None => run_repl(config),
    }
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "quill_vm=debug,quill=debug",
        _ => "quill_vm=trace,quill=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Start the interactive REPL
fn run_repl(config: VmConfig) -> ExitCode {
    match repl::Repl::new(config) {
        Ok(mut repl) => {
            if let Err(e) = repl.run() {
                eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{}: Failed to initialize REPL: {:?}",
                "Error".red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

/// Execute a Quill file asynchronously.
async fn run_file(path: &Path, config: VmConfig, disassemble: bool) -> ExitCode {
    if !path.exists() {
        eprintln!(
            "{}: file not found '{}'",
            "Error".red().bold(),
            path.display().cyan()
        );
        return ExitCode::FAILURE;
    }

    if disassemble {
        return match tokio::fs::read_to_string(path).await {
            Ok(source) => print_bytecode(&source, config),
            Err(e) => {
                repl::print_error(&e.into());
                ExitCode::FAILURE
            }
        };
    }

    let engine = AsyncEngine::from_engine(Engine::with_config(config));
    match engine.eval_file(path).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            repl::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Evaluate code from the command line and print its value.
async fn run_eval(code: &str, config: VmConfig, disassemble: bool) -> ExitCode {
    if disassemble {
        return print_bytecode(code, config);
    }

    let engine = AsyncEngine::from_engine(Engine::with_config(config));
    match engine.eval(code).await {
        Ok(value) => {
            if !value.is_null() {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            repl::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_bytecode(source: &str, config: VmConfig) -> ExitCode {
    match Engine::with_config(config).compile(source) {
        Ok(bytecode) => {
            print!("{}", bytecode.disassemble());
            ExitCode::SUCCESS
        }
        Err(e) => {
            repl::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
