use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "qa-reconcile",
    version,
    about = "Apply QA report corrections to local record JSON files and quarantine flagged records"
)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile a records folder against a QA report folder
    Reconcile(ReconcileArgs),
    /// Show the resolved configuration
    Config,
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    /// Folder with local record JSON/PDF files
    #[arg(long)]
    records_dir: PathBuf,
    /// Folder with QA report JSON files
    #[arg(long)]
    qa_dir: PathBuf,
    /// Subfolder for out-of-scope records
    #[arg(long)]
    out_of_scope_dir: Option<String>,
    /// Subfolder for duplicate records
    #[arg(long)]
    duplicates_dir: Option<String>,
    /// Show actions without writing or moving files
    #[arg(long)]
    dry_run: bool,
    /// Path to Markdown report file (default: QA dir)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Runs the selected command. `Ok(false)` means the command finished but
/// reported issues.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    let report = match cli.command {
        Command::Reconcile(args) => {
            commands::reconcile::run(&commands::reconcile::ReconcileOptions {
                records_dir: args.records_dir,
                qa_dir: args.qa_dir,
                out_of_scope_dir: args.out_of_scope_dir,
                duplicates_dir: args.duplicates_dir,
                dry_run: args.dry_run,
                report: args.report,
                quiet: cli.quiet,
            })?
        }
        Command::Config => commands::show_config::run()?,
    };
    print_report(&report, cli.json)?;
    Ok(report.ok)
}
