use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use multibody::{equations_of_motion, MultibodyAlgorithm, MultibodyErrors, RobotBuilder};
use std::{collections::BTreeMap, path::{Path, PathBuf}, process::ExitCode};
use symbolic::{Assignment, SymbolTable};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "symdyn", version, about = "Closed-form robot dynamics", long_about = None)]
struct Cli {
    /// Raise the log level (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Joint torques from joint accelerations (composite inertias)
    Inverse {
        robot: PathBuf,
        /// Only print how many equations of each kind were generated
        #[arg(long)]
        summary: bool,
    },
    /// Joint accelerations from joint torques (articulated inertias)
    Direct {
        robot: PathBuf,
        #[arg(long)]
        summary: bool,
    },
    /// Write an example robot description
    Template { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), MultibodyErrors> {
    match command {
        Commands::Inverse { robot, summary } => {
            generate(&robot, MultibodyAlgorithm::CompositeRigidBody, summary)
        }
        Commands::Direct { robot, summary } => {
            generate(&robot, MultibodyAlgorithm::ArticulatedBody, summary)
        }
        Commands::Template { path } => {
            RobotBuilder::template().save(&path)?;
            println!("{} {}", "wrote".green(), path.display());
            Ok(())
        }
    }
}

fn generate(path: &Path, algorithm: MultibodyAlgorithm, summary: bool) -> Result<(), MultibodyErrors> {
    let robot = RobotBuilder::load(path)?.build()?;
    let table = equations_of_motion(&robot, algorithm)?;

    let title = match algorithm {
        MultibodyAlgorithm::CompositeRigidBody => "inverse dynamics",
        MultibodyAlgorithm::ArticulatedBody => "direct dynamics",
    };
    println!(
        "{} {} ({} links, {} equations)",
        robot.name.bold().cyan(),
        title.bold(),
        robot.num_links(),
        table.len()
    );

    if summary {
        for (kind, count) in kinds(&table) {
            println!("  {:<6} {count}", kind.yellow());
        }
    } else {
        table.assignments().iter().for_each(print_assignment);
    }
    Ok(())
}

fn print_assignment(assignment: &Assignment) {
    println!("{} = {}", assignment.symbol.to_string().green(), assignment.expr);
}

/// Assignment counts keyed by name without its indices, e.g. `TS` for `TS123`.
fn kinds(table: &SymbolTable) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for assignment in table.assignments() {
        let name = assignment.symbol.name();
        let name = name.split('_').next().unwrap_or(name);
        let kind = name.trim_end_matches(|c: char| c.is_ascii_digit());
        *counts.entry(kind.to_string()).or_insert(0) += 1;
    }
    counts
}
