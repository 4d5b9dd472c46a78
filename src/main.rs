use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use pluqqy::store::Store;

#[derive(Parser, Debug)]
#[command(name = "pluqqy")]
#[command(author, version, about = "Terminal-first composer for agent prompt pipelines")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Project directory (defaults to the current directory)
    path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scaffold a pluqqy project in a directory
    Init {
        /// Directory to initialize (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Generate shell completions
    Completion {
        /// Shell to generate for
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { path }) => {
            let root = path.unwrap_or_else(|| PathBuf::from("."));
            match pluqqy::init::init_project(&root) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{} {}", "Init failed:".red().bold(), e);
                    ExitCode::from(1)
                }
            }
        }
        Some(Command::Completion { shell }) => {
            let mut cmd = Args::command();
            generate(shell, &mut cmd, "pluqqy", &mut io::stdout());
            ExitCode::SUCCESS
        }
        None => {
            let root = args.path.unwrap_or_else(|| PathBuf::from("."));
            // Invalid project directory is its own exit code, checked
            // before any terminal state changes.
            if !Store::is_project(&root) {
                eprintln!(
                    "{} {} is not a pluqqy project (run {} first)",
                    "Error:".red().bold(),
                    root.display(),
                    "pluqqy init".cyan()
                );
                return ExitCode::from(2);
            }
            match pluqqy::tui::run(root) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    ExitCode::from(1)
                }
            }
        }
    }
}
