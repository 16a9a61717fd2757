pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod processor;
pub mod runner;
pub mod server;
pub mod writer;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, CliCommand};
use config::EngineConfig;
use pipeline::Pipeline;

pub async fn run() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.global.verbose);

    // 1. ── Configure ──────────────────────────────────────────────────
    let mut config = EngineConfig::load(args.global.config.as_deref())?;
    args.global.apply(&mut config);

    match args.command {
        CliCommand::Run { script } => {
            // 2. ── Load ───────────────────────────────────────────────
            let script = parser::load_script(&script)?;

            // 3. ── Translate, build, execute ──────────────────────────
            let outcome = Pipeline::new(config).process(&script).await;

            // 4. ── Report ─────────────────────────────────────────────
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        CliCommand::Emit { script, output } => {
            let script = parser::load_script(&script)?;
            let statements =
                processor::translate(&script).with_context(|| "Translating script")?;
            let program = writer::cpp::assemble(&statements);

            match output {
                Some(path) => std::fs::write(&path, &program.source)
                    .with_context(|| format!("Writing {}", path.display()))?,
                None => print!("{}", program.source),
            }
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Catalog => {
            for entry in processor::catalog::CATALOG {
                let arity = entry.arity().to_string();
                println!("{:<22} {arity:<24} {}", entry.name, entry.declaration());
            }
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Serve { addr } => {
            server::serve(config, addr).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `RUST_LOG` wins; otherwise the verbosity flag picks the level.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "dsl2cpp=info,tower_http=info",
        1 => "dsl2cpp=debug,tower_http=debug",
        _ => "dsl2cpp=trace,tower_http=debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
