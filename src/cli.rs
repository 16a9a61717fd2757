use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{EngineConfig, StderrPolicy};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// JSON engine config; missing fields keep their defaults
    #[arg(long, global = true, env = "DSL2CPP_CONFIG")]
    pub config: Option<PathBuf>,
    /// Parent directory for per-request workspaces
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
    /// C++ compiler to invoke
    #[arg(long, global = true)]
    pub compiler: Option<String>,
    /// Leave generated sources and binaries on disk
    #[arg(long, global = true)]
    pub keep_workspaces: bool,
    /// Treat stderr output from a successful run as a warning
    #[arg(long, global = true)]
    pub allow_stderr: bool,
    /// -v for debug logs, -vv for trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Translate, build and run a script, printing the outcome as JSON
    Run {
        /// Script file, `-` for stdin, or a .json request body
        script: PathBuf,
    },
    /// Print the generated C++ program without building it
    Emit {
        script: PathBuf,
        /// Write the program here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List every operation the language accepts
    Catalog,
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3001")]
        addr: SocketAddr,
    },
}

impl GlobalArgs {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(dir) = &self.workspace {
            config.workspace_root = dir.clone();
        }
        if let Some(compiler) = &self.compiler {
            config.toolchain.compiler = compiler.clone();
        }
        if self.keep_workspaces {
            config.keep_workspaces = true;
        }
        if self.allow_stderr {
            config.stderr_policy = StderrPolicy::Warn;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "dsl2cpp",
            "run",
            "script.dsl",
            "--compiler",
            "clang++",
            "--allow-stderr",
            "-vv",
        ]);
        let mut config = EngineConfig::default();
        cli.global.apply(&mut config);

        assert_eq!(config.toolchain.compiler, "clang++");
        assert_eq!(config.stderr_policy, StderrPolicy::Warn);
        assert_eq!(cli.global.verbose, 2);
        assert!(!config.keep_workspaces);
        assert!(matches!(cli.command, CliCommand::Run { .. }));
    }

    #[test]
    fn test_serve_default_addr() {
        let cli = Cli::parse_from(["dsl2cpp", "serve"]);
        match cli.command {
            CliCommand::Serve { addr } => assert_eq!(addr.port(), 3001),
            other => panic!("unexpected {other:?}"),
        }
    }
}
